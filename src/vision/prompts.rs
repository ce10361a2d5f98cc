//! 提示词模板：网格 / front / 各侧视图 / 网格象限重生成
//!
//! 风格分为写实（realistic）与哑光黏土（clay）；侧视图共用「与 front 参考保持一致」的前缀。

use crate::core::{RenderStyle, SideView, ViewSettings, ViewStrategy};
use crate::imaging::ViewImage;
use crate::vision::ViewRequest;

pub const GRID_VIEW_PROMPT: &str = "You are a precise product visualization assistant. Your task is to generate a single, composite 2x2 grid image containing four orthographic views of the main product from the user's uploaded image.

Step 1: Isolate the Product
First, identify the single, primary product in the user's image. If multiple variants (e.g., colors) are present, choose only ONE to use consistently. Completely isolate this product from any models, people, backgrounds, or other distracting elements.

Step 2: Generate and Place Views
Using the isolated product, generate realistic, high-quality images to fill the four quadrants of a 2x2 grid. The product should be on a solid white background within each quadrant. The final output must be a single image file with the grid layout.

- Top-Left Quadrant: The product seen directly from the front.
- Top-Right Quadrant: The product seen directly from the back.
- Bottom-Left Quadrant: The product's left side, seen directly from the left.
- Bottom-Right Quadrant: The product's right side, seen directly from the right.

Crucial Instructions:
- Perfect Alignment & Scale: The product must be perfectly centered and be the exact same size in all four views.
- Studio Lighting: Apply neutral, omnidirectional studio lighting to eliminate all shadows.";

pub const CLAY_GRID_VIEW_PROMPT: &str = "First, identify the main product in the uploaded image. Isolate it from any models, backgrounds, or other objects.

Then, create a single, composite 2x2 grid image containing four reference views for a 3D digital twin of ONLY the isolated product. Render the product as a 3D-scannable model made of non-reflective, matte gray clay. The camera for all views must use an orthographic projection with no pitch or roll. The final output must be a single image file with the grid layout.

- Top-left: The product seen directly from the front.
- Top-right: The product seen directly from the back.
- Bottom-left: The product's left side, seen directly from the left.
- Bottom-right: The product's right side, seen directly from the right.

The product's scale, position, and lighting must be identical in all four views. The scene must have diffused, omnidirectional lighting to eliminate all shadows. The background must be a seamless, solid white.";

const ISOLATE_PRODUCT: &str = "You are a precise product visualization assistant. From the user's uploaded image, identify the single, primary product. If multiple variants (e.g., colors) are present, choose only ONE. Completely isolate this product from any models, people, backgrounds, or other distracting elements.";

const WHITE_STUDIO: &str = "perfectly centered, on a seamless, solid white background. Apply neutral, omnidirectional studio lighting to eliminate all shadows.";

const CLAY_MATERIAL: &str = "Render the product as a 3D-scannable model made of non-reflective, matte gray clay.";

const CONSISTENT_VIEW_BASE: &str = "You are a precise product visualization assistant. You will be given two images: a user's original upload and a generated 'Front View' reference image. Your task is to generate a new view of the product shown in the 'Front View' reference.

Crucially, the new image must be perfectly consistent with the 'Front View' reference in style, scale, lighting, and texture. The product should be perfectly centered on a seamless, solid white background with neutral, omnidirectional lighting to eliminate shadows.";

const RIGHT_WITH_LEFT_CONTEXT: &str = "You are a precise product visualization assistant. You will be given three images: the user's original product, a clean 'Front View' reference, and a clean 'Left View' reference.
Your task is to generate the product's right side view.

Crucial Instructions:
- The right view MUST be the mirror opposite of the provided 'Left View'.
- The new image must be perfectly consistent with the 'Front View' in style, scale, lighting, and texture.
- The product must be perfectly centered on a seamless, solid white background.
- Use neutral, omnidirectional lighting to eliminate all shadows.";

pub fn grid(style: RenderStyle) -> &'static str {
    match style {
        RenderStyle::Realistic => GRID_VIEW_PROMPT,
        RenderStyle::Clay => CLAY_GRID_VIEW_PROMPT,
    }
}

pub fn front(style: RenderStyle) -> String {
    match style {
        RenderStyle::Realistic => format!(
            "{ISOLATE_PRODUCT} The final output must be a high-resolution image of ONLY the isolated product, {WHITE_STUDIO} Your task is to generate a direct front view of the isolated product."
        ),
        RenderStyle::Clay => format!(
            "{ISOLATE_PRODUCT}\nYour task is to render the isolated product as a 3D-scannable model made of non-reflective, matte gray clay.\nThe final output must be a high-resolution image of ONLY this clay model, {WHITE_STUDIO} Your task is to generate a direct front view of the isolated clay model."
        ),
    }
}

fn side_description(view: SideView) -> &'static str {
    match view {
        SideView::Back => "A direct back view.",
        SideView::Left => "The product's left side, seen directly from the left.",
        SideView::Right => "The product's right side, seen directly from the right. This view should be the mirror opposite of the left view, showing the features on the product's other side.",
    }
}

/// 以 front 为一致性参考的侧视图提示词
pub fn side(view: SideView, style: RenderStyle) -> String {
    let mut prompt = format!(
        "{CONSISTENT_VIEW_BASE}\n\nThe specific view to generate is: {}",
        side_description(view)
    );
    if style == RenderStyle::Clay {
        prompt.push(' ');
        prompt.push_str(CLAY_MATERIAL);
    }
    prompt
}

/// right 视图：额外提供 left 视图，要求镜像
pub fn right_with_left_context(style: RenderStyle) -> String {
    let mut prompt = RIGHT_WITH_LEFT_CONTEXT.to_string();
    if style == RenderStyle::Clay {
        prompt.push_str("\n- ");
        prompt.push_str(CLAY_MATERIAL);
    }
    prompt
}

/// 只重画网格中某一个象限，其余三个保持不变
pub fn regenerate_quadrant(view: SideView) -> String {
    let quadrant = view.key().quadrant().label();
    let view_name = view.display_name();
    format!(
        "You are a precise product visualization assistant. You will be given a user's original product image and a 2x2 grid image that contains four views of that product.

Your task is to regenerate ONLY the {quadrant} quadrant of the grid to show a new {view_name}.

Crucial Instructions:
- Only modify the specified {quadrant} quadrant. The other three quadrants must remain completely untouched.
- The new view must be perfectly consistent with the other views in terms of the product's scale, position, lighting, and style.
- The final output must be the complete grid image with only the designated quadrant updated."
    )
}

// ---- 请求构造：提示词 + 参考图顺序 ----

/// 主流程第一步：网格或 front
pub fn initial_request(settings: ViewSettings, source: &ViewImage) -> ViewRequest {
    let prompt = match settings.strategy {
        ViewStrategy::Grid => grid(settings.style).to_string(),
        ViewStrategy::Individual => front(settings.style),
    };
    ViewRequest::new(prompt).with_image(source.clone())
}

/// 单个侧视图请求：参考图顺序为 原图、front、(left)
pub fn side_request(
    view: SideView,
    style: RenderStyle,
    source: &ViewImage,
    front_view: &ViewImage,
    left_view: Option<&ViewImage>,
) -> ViewRequest {
    let base = |prompt: String| {
        ViewRequest::new(prompt)
            .with_image(source.clone())
            .with_image(front_view.clone())
    };
    match (view, left_view) {
        (SideView::Right, Some(left)) => {
            base(right_with_left_context(style)).with_image(left.clone())
        }
        _ => base(side(view, style)),
    }
}

/// 网格象限重生成请求：原图 + 当前网格
pub fn quadrant_request(view: SideView, source: &ViewImage, grid_image: &ViewImage) -> ViewRequest {
    ViewRequest::new(regenerate_quadrant(view))
        .with_image(source.clone())
        .with_image(grid_image.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_prompt_depends_on_style() {
        assert!(grid(RenderStyle::Clay).contains("matte gray clay"));
        assert!(!grid(RenderStyle::Realistic).contains("clay"));
    }

    #[test]
    fn test_quadrant_prompt_mapping() {
        let p = regenerate_quadrant(SideView::Back);
        assert!(p.contains("ONLY the top-right quadrant"));
        assert!(p.contains("new back view"));
        assert!(regenerate_quadrant(SideView::Left).contains("bottom-left"));
        assert!(regenerate_quadrant(SideView::Right).contains("bottom-right"));
    }

    #[test]
    fn test_right_request_uses_left_when_available() {
        let source = ViewImage::png(vec![0]);
        let front_view = ViewImage::png(vec![1]);
        let left = ViewImage::png(vec![2]);

        let with_left =
            side_request(SideView::Right, RenderStyle::Realistic, &source, &front_view, Some(&left));
        assert_eq!(with_left.images, vec![source.clone(), front_view.clone(), left.clone()]);
        assert!(with_left.prompt.contains("mirror opposite of the provided 'Left View'"));

        let fallback =
            side_request(SideView::Right, RenderStyle::Realistic, &source, &front_view, None);
        assert_eq!(fallback.images.len(), 2);
        assert!(fallback.prompt.contains("seen directly from the right"));
    }

    #[test]
    fn test_left_context_ignored_for_other_views() {
        let img = ViewImage::png(vec![0]);
        let req = side_request(SideView::Back, RenderStyle::Clay, &img, &img, Some(&img));
        assert_eq!(req.images.len(), 2);
        assert!(req.prompt.contains("A direct back view."));
        assert!(req.prompt.contains("matte gray clay"));
    }
}

//! 视图槽位：front / back / left / right 与 2x2 网格象限映射

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::imaging::ViewImage;

/// 四个标准正交视图
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKey {
    Front,
    Back,
    Left,
    Right,
}

impl ViewKey {
    pub const ALL: [ViewKey; 4] = [ViewKey::Front, ViewKey::Back, ViewKey::Left, ViewKey::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKey::Front => "front",
            ViewKey::Back => "back",
            ViewKey::Left => "left",
            ViewKey::Right => "right",
        }
    }

    /// 该视图在 2x2 网格中的位置
    pub fn quadrant(&self) -> Quadrant {
        match self {
            ViewKey::Front => Quadrant::TopLeft,
            ViewKey::Back => Quadrant::TopRight,
            ViewKey::Left => Quadrant::BottomLeft,
            ViewKey::Right => Quadrant::BottomRight,
        }
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 可单独重新生成的视图（front 是一致性锚点，不可重生成）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideView {
    Back,
    Left,
    Right,
}

impl SideView {
    pub fn key(&self) -> ViewKey {
        match self {
            SideView::Back => ViewKey::Back,
            SideView::Left => ViewKey::Left,
            SideView::Right => ViewKey::Right,
        }
    }

    /// 提示词里使用的视图名称
    pub fn display_name(&self) -> &'static str {
        match self {
            SideView::Back => "back view",
            SideView::Left => "left side view",
            SideView::Right => "right side view",
        }
    }
}

impl TryFrom<ViewKey> for SideView {
    type Error = ViewKey;

    fn try_from(key: ViewKey) -> Result<Self, Self::Error> {
        match key {
            ViewKey::Back => Ok(SideView::Back),
            ViewKey::Left => Ok(SideView::Left),
            ViewKey::Right => Ok(SideView::Right),
            ViewKey::Front => Err(key),
        }
    }
}

impl fmt::Display for SideView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key().as_str())
    }
}

/// 2x2 网格象限；index 0..4 依次为左上、右上、左下、右下
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::TopLeft,
        Quadrant::TopRight,
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
    ];

    pub fn index(&self) -> u32 {
        match self {
            Quadrant::TopLeft => 0,
            Quadrant::TopRight => 1,
            Quadrant::BottomLeft => 2,
            Quadrant::BottomRight => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Quadrant::TopLeft => "top-left",
            Quadrant::TopRight => "top-right",
            Quadrant::BottomLeft => "bottom-left",
            Quadrant::BottomRight => "bottom-right",
        }
    }
}

/// 四个可选视图槽位
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewSet {
    pub front: Option<ViewImage>,
    pub back: Option<ViewImage>,
    pub left: Option<ViewImage>,
    pub right: Option<ViewImage>,
}

impl ViewSet {
    pub fn get(&self, key: ViewKey) -> Option<&ViewImage> {
        match key {
            ViewKey::Front => self.front.as_ref(),
            ViewKey::Back => self.back.as_ref(),
            ViewKey::Left => self.left.as_ref(),
            ViewKey::Right => self.right.as_ref(),
        }
    }

    pub fn set(&mut self, key: ViewKey, image: ViewImage) {
        let slot = match key {
            ViewKey::Front => &mut self.front,
            ViewKey::Back => &mut self.back,
            ViewKey::Left => &mut self.left,
            ViewKey::Right => &mut self.right,
        };
        *slot = Some(image);
    }

    pub fn populated(&self) -> usize {
        ViewKey::ALL.iter().filter(|k| self.get(**k).is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.populated() == ViewKey::ALL.len()
    }

    /// 四个槽位都存在时返回 CompleteViews
    pub fn complete(&self) -> Option<CompleteViews> {
        Some(CompleteViews {
            front: self.front.clone()?,
            back: self.back.clone()?,
            left: self.left.clone()?,
            right: self.right.clone()?,
        })
    }

    /// 已填充的 (视图, 图片) 对，按 front/back/left/right 顺序
    pub fn iter(&self) -> impl Iterator<Item = (ViewKey, &ViewImage)> + '_ {
        ViewKey::ALL
            .into_iter()
            .filter_map(move |k| self.get(k).map(|img| (k, img)))
    }
}

/// 四视图齐全的证明：重建请求只接受这个类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteViews {
    pub front: ViewImage,
    pub back: ViewImage,
    pub left: ViewImage,
    pub right: ViewImage,
}

impl CompleteViews {
    pub fn get(&self, key: ViewKey) -> &ViewImage {
        match key {
            ViewKey::Front => &self.front,
            ViewKey::Back => &self.back,
            ViewKey::Left => &self.left,
            ViewKey::Right => &self.right,
        }
    }
}

impl From<CompleteViews> for ViewSet {
    fn from(views: CompleteViews) -> Self {
        Self {
            front: Some(views.front),
            back: Some(views.back),
            left: Some(views.left),
            right: Some(views.right),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadrant_mapping() {
        assert_eq!(ViewKey::Front.quadrant().index(), 0);
        assert_eq!(ViewKey::Back.quadrant(), Quadrant::TopRight);
        assert_eq!(ViewKey::Left.quadrant(), Quadrant::BottomLeft);
        assert_eq!(ViewKey::Right.quadrant().label(), "bottom-right");
    }

    #[test]
    fn test_front_is_not_a_side_view() {
        assert!(SideView::try_from(ViewKey::Front).is_err());
        assert_eq!(SideView::try_from(ViewKey::Left), Ok(SideView::Left));
    }

    #[test]
    fn test_view_set_complete() {
        let mut views = ViewSet::default();
        assert!(views.complete().is_none());
        for key in ViewKey::ALL {
            views.set(key, ViewImage::png(vec![key.quadrant().index() as u8]));
        }
        assert!(views.is_complete());
        let complete = views.complete().unwrap();
        assert_eq!(complete.get(ViewKey::Right).bytes(), &[3]);
        assert_eq!(views.iter().count(), 4);
    }
}

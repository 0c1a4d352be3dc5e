//! Drawing tools and pointer input
//!
//! The active tool is an explicit enum and every pointer/key event goes
//! through one dispatcher in the annotator that matches on
//! `(tool, gesture, event)`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::surface::ObjectId;

/// Tool driving pointer input on the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawingTool {
    /// Free-hand brush
    Pencil,
    /// Removes objects touched during a drag
    Eraser,
    /// Picks overlays in read order
    Sort,
    /// Draws a recognition region
    Ocr,
    /// Picks objects, draws nothing
    Select,
    #[default]
    None,
}

/// Single-letter shortcuts
const SHORTCUTS: &[(char, DrawingTool)] = &[
    ('o', DrawingTool::Ocr),
    ('p', DrawingTool::Pencil),
    ('e', DrawingTool::Eraser),
    ('s', DrawingTool::Sort),
    ('v', DrawingTool::Select),
];

impl DrawingTool {
    /// Tool bound to a shortcut letter
    pub fn from_shortcut(key: char) -> Option<Self> {
        let key = key.to_ascii_lowercase();
        SHORTCUTS.iter().find(|(k, _)| *k == key).map(|(_, tool)| *tool)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DrawingTool::Pencil => "pencil",
            DrawingTool::Eraser => "eraser",
            DrawingTool::Sort => "sort",
            DrawingTool::Ocr => "ocr",
            DrawingTool::Select => "select",
            DrawingTool::None => "none",
        }
    }
}

impl fmt::Display for DrawingTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrawingTool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pencil" => Ok(DrawingTool::Pencil),
            "eraser" => Ok(DrawingTool::Eraser),
            "sort" => Ok(DrawingTool::Sort),
            "ocr" => Ok(DrawingTool::Ocr),
            "select" => Ok(DrawingTool::Select),
            "none" => Ok(DrawingTool::None),
            other => Err(format!("unknown drawing tool: {}", other)),
        }
    }
}

/// Keyboard input relevant to the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Alt,
    Char(char),
}

/// Pointer and keyboard events, positions in screen space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown { at: Point, alt: bool },
    PointerMove { at: Point },
    PointerUp { at: Point },
    Wheel { at: Point, delta_y: f64 },
    KeyDown { key: Key },
}

/// Drag in progress
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Gesture {
    #[default]
    Idle,
    /// Alt+drag, last pointer position in screen space
    Panning { last: Point },
    /// Pencil stroke, surface-space points
    Drawing { points: Vec<Point> },
    /// Objects touched so far, in touch order
    Erasing { touched: Vec<ObjectId> },
    Sorting { touched: Vec<ObjectId> },
    /// Recognition region; the session owns its state
    Region,
}

impl Gesture {
    /// Record an object touched by an eraser or sort drag
    pub fn touch(&mut self, id: ObjectId) {
        if let Gesture::Erasing { touched } | Gesture::Sorting { touched } = self {
            if !touched.contains(&id) {
                touched.push(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcuts() {
        assert_eq!(DrawingTool::from_shortcut('o'), Some(DrawingTool::Ocr));
        assert_eq!(DrawingTool::from_shortcut('O'), Some(DrawingTool::Ocr));
        assert_eq!(DrawingTool::from_shortcut('z'), None);
    }

    #[test]
    fn test_parse_roundtrip() {
        for tool in [
            DrawingTool::Pencil,
            DrawingTool::Eraser,
            DrawingTool::Sort,
            DrawingTool::Ocr,
            DrawingTool::Select,
            DrawingTool::None,
        ] {
            assert_eq!(tool.to_string().parse::<DrawingTool>(), Ok(tool));
        }
        assert!("lasso".parse::<DrawingTool>().is_err());
    }

    #[test]
    fn test_touch_dedupes_in_order() {
        let mut gesture = Gesture::Sorting { touched: Vec::new() };
        gesture.touch(3);
        gesture.touch(1);
        gesture.touch(3);
        assert_eq!(gesture, Gesture::Sorting { touched: vec![3, 1] });

        let mut idle = Gesture::Idle;
        idle.touch(1);
        assert_eq!(idle, Gesture::Idle);
    }
}

//! Catalogue of fonts, sprite frames and textures the scene can show.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::node::Size;

/// Fixed-pitch metrics used to size labels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontMetrics {
    pub glyph_width: f32,
    pub line_height: f32,
}

#[derive(Clone, Debug)]
pub struct Resources {
    fonts: FxHashMap<String, FontMetrics>,
    frames: FxHashMap<String, Size>,
    textures: FxHashSet<String>,
}

impl Resources {
    /// An empty catalogue.
    pub fn empty() -> Self {
        Self {
            fonts: FxHashMap::default(),
            frames: FxHashMap::default(),
            textures: FxHashSet::default(),
        }
    }

    pub fn with_font(mut self, name: &str, metrics: FontMetrics) -> Self {
        self.fonts.insert(name.to_string(), metrics);
        self
    }

    pub fn with_frame(mut self, name: &str, size: Size) -> Self {
        self.frames.insert(name.to_string(), size);
        self
    }

    pub fn with_texture(mut self, name: &str) -> Self {
        self.textures.insert(name.to_string());
        self
    }

    pub fn has_font(&self, name: &str) -> bool {
        self.fonts.contains_key(name)
    }

    pub fn font(&self, name: &str) -> Option<FontMetrics> {
        self.fonts.get(name).copied()
    }

    pub fn has_frame(&self, name: &str) -> bool {
        self.frames.contains_key(name)
    }

    pub fn frame_size(&self, name: &str) -> Option<Size> {
        self.frames.get(name).copied()
    }

    pub fn has_texture(&self, name: &str) -> bool {
        self.textures.contains(name)
    }

    /// Rendered size of `text` in `font`; zero for unknown fonts.
    pub fn measure(&self, text: &str, font: &str) -> Size {
        let Some(metrics) = self.font(font) else {
            return Size::ZERO;
        };
        let lines = text.split('\n');
        let (mut widest, mut count) = (0usize, 0usize);
        for line in lines {
            widest = widest.max(line.chars().count());
            count += 1;
        }
        Size::new(widest as f32 * metrics.glyph_width, count as f32 * metrics.line_height)
    }
}

impl Default for Resources {
    fn default() -> Self {
        Resources::empty()
            .with_font("bigFont.fnt", FontMetrics { glyph_width: 20.0, line_height: 32.0 })
            .with_font("goldFont.fnt", FontMetrics { glyph_width: 22.0, line_height: 36.0 })
            .with_font("chatFont.fnt", FontMetrics { glyph_width: 10.0, line_height: 18.0 })
            .with_frame("exMark_001.png", Size::new(22.0, 60.0))
            .with_frame("GJ_button_01.png", Size::new(40.0, 40.0))
            .with_texture("GJ_square01.png")
            .with_texture("square02b_small.png")
            .with_texture("GJ_button_01.png")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let res = Resources::default();
        assert!(res.has_font("bigFont.fnt"));
        assert!(res.has_frame("exMark_001.png"));
        assert!(res.has_texture("GJ_square01.png"));
        assert!(!res.has_font("comic.fnt"));
    }

    #[test]
    fn measure_multiline() {
        let res = Resources::default();
        assert_eq!(res.measure("ab\nabcd", "chatFont.fnt"), Size::new(40.0, 36.0));
        assert_eq!(res.measure("ab", "missing.fnt"), Size::ZERO);
    }
}

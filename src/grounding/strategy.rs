use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{ArenaError, ArenaResult};
use crate::grounding::types::Point;

/// Response token budget for a grounding query; a reply is a single point.
pub const GROUNDING_MAX_TOKENS: u32 = 256;

/// Prompt/pattern pair for a grounding model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundingStrategy {
    /// Answers `(x,y)` on a 0–1000 grid.
    #[default]
    #[serde(alias = "ui-tars")]
    UiTars,
    /// Answers a point wrapped in tags, e.g. `<point>(x,y)</point>`.
    Mgm,
}

impl GroundingStrategy {
    pub fn prompt(self, reference: &str) -> String {
        match self {
            GroundingStrategy::UiTars => format!(
                "Output only the coordinate of one point in your response. \
                 What element matches the following task: {reference}"
            ),
            GroundingStrategy::Mgm => {
                format!("Provide the center point for the UI element: \"{reference}\" in the image.")
            }
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            GroundingStrategy::UiTars => r"\((\d+),(\d+)\)",
            GroundingStrategy::Mgm => r">\((\d+),(\d+)\)<",
        }
    }

    pub fn frequency_penalty(self) -> f64 {
        match self {
            GroundingStrategy::UiTars => 0.2,
            GroundingStrategy::Mgm => 1.0,
        }
    }

    pub fn extractor(self) -> ArenaResult<CoordinateExtractor> {
        let re = Regex::new(self.pattern())
            .map_err(|e| ArenaError::Config(format!("grounding pattern for {self:?}: {e}")))?;
        Ok(CoordinateExtractor { re })
    }
}

/// Pulls the first on-grid coordinate pair out of a grounding reply.
#[derive(Debug, Clone)]
pub struct CoordinateExtractor {
    re: Regex,
}

impl CoordinateExtractor {
    pub fn extract(&self, reply: &str) -> Option<Point> {
        self.re.captures_iter(reply).find_map(|caps| {
            let x = caps.get(1)?.as_str().parse().ok()?;
            let y = caps.get(2)?.as_str().parse().ok()?;
            Point::from_permille(x, y)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_tars_extracts_pair() {
        let ex = GroundingStrategy::UiTars.extractor().unwrap();
        assert_eq!(ex.extract("(500,500)"), Point::from_permille(500, 500));
        assert_eq!(ex.extract("click at (12,980) please"), Point::from_permille(12, 980));
        assert_eq!(ex.extract("(12, 980)"), None);
        assert_eq!(ex.extract("no idea"), None);
    }

    #[test]
    fn test_mgm_requires_tag_delimiters() {
        let ex = GroundingStrategy::Mgm.extractor().unwrap();
        assert_eq!(ex.extract("(300,400)"), None);
        assert_eq!(ex.extract("<point>(300,400)</point>"), Point::from_permille(300, 400));
    }

    #[test]
    fn test_off_grid_pairs_are_skipped() {
        let ex = GroundingStrategy::UiTars.extractor().unwrap();
        assert_eq!(ex.extract("(1500,20) or (150,20)"), Point::from_permille(150, 20));
        assert_eq!(ex.extract("(99999999999,1)"), None);
    }

    #[test]
    fn test_prompts() {
        assert!(GroundingStrategy::UiTars
            .prompt("ok button")
            .ends_with("What element matches the following task: ok button"));
        assert_eq!(
            GroundingStrategy::Mgm.prompt("ok button"),
            "Provide the center point for the UI element: \"ok button\" in the image."
        );
    }
}

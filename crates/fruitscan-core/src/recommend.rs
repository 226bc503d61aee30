//! Human-readable advice attached to every report.

use crate::profile::FruitKind;

/// Advice used on the recovered-failure path.
pub const FAILURE_ADVICE: &str = "Image processing failed. Try another photo.";

/// Build the advice string for a final count: a yield note for the count
/// band plus a harvest tip for the category, joined with spaces.
pub fn recommendation_text(count: u32, kind: FruitKind) -> String {
    let mut lines: Vec<String> = Vec::new();

    if count == 0 {
        lines.push("No fruit detected. Try:".into());
        lines.push("- shooting in better light".into());
        lines.push("- making sure the fruit is in frame".into());
        lines.push("- a different angle".into());
    } else if count < 3 {
        lines.push(format!("Low count ({count} fruits)."));
        lines.push("Consider checking the tree's condition.".into());
    } else if count < 10 {
        lines.push(format!("Average yield: {count} fruits."));
        lines.push("The tree is in normal shape.".into());
    } else if count < 20 {
        lines.push(format!("Good yield: {count} fruits!"));
        lines.push("Harvest recommended in 1-2 weeks.".into());
    } else {
        lines.push(format!("Excellent yield: {count} fruits!"));
        lines.push("Harvest recommended this week.".into());
    }

    lines.push(
        match kind {
            FruitKind::Apple => "Apples: best picked at full color.",
            FruitKind::Pear => "Pears: pick when the stem separates easily.",
            FruitKind::Cherry => "Cherries: pick when fully colored.",
            FruitKind::Plum => "Plums: ripe when they yield to light pressure.",
        }
        .into(),
    );

    lines.join(" ")
}

use banana_contracts::presets::DocType;
use banana_contracts::review::CRITERIA;

/// Preamble shared by every generation prompt.
pub const DIAGRAM_GUIDELINES: &str = "\
Create a high-quality technical diagram with these requirements:

VISUAL QUALITY:
- Clean white or light background (no textures or gradients)
- High contrast for readability and printing
- Professional, publication-ready appearance
- Sharp, clear lines and text
- Adequate spacing between elements to prevent crowding

TYPOGRAPHY:
- Clear, readable sans-serif fonts (Arial, Helvetica style)
- Minimum 10pt font size for all labels
- Consistent font sizes throughout
- All text horizontal or clearly readable
- No overlapping text

TECHNICAL STANDARDS:
- Accurate representation of concepts
- Clear labels for all components
- Include legends where appropriate
- Use standard notation and symbols
- Logical grouping of related elements

ACCESSIBILITY:
- Colorblind-friendly color palette (use Okabe-Ito colors if using color)
- High contrast between elements
- Redundant encoding (shapes + colors, not just colors)
- Works well in grayscale

LAYOUT:
- Logical flow (left-to-right or top-to-bottom)
- Clear visual hierarchy
- Balanced composition
- Appropriate use of whitespace
- No clutter or unnecessary decorative elements";

pub fn initial_prompt(request: &str) -> String {
    format!(
        "{DIAGRAM_GUIDELINES}\n\nUSER REQUEST: {request}\n\n\
         Generate a publication-quality technical diagram that meets all the guidelines above."
    )
}

/// First-iteration prompt when a source image is attached.
pub fn edit_prompt(request: &str) -> String {
    format!(
        "{DIAGRAM_GUIDELINES}\n\n\
         EDITING MODE: Modify the provided diagram based on these instructions.\n\
         Keep all existing elements unless the user explicitly asks to remove them.\n\n\
         USER EDIT REQUEST: {request}\n\n\
         Generate the updated diagram maintaining publication quality."
    )
}

pub fn improve_prompt(request: &str, critique: &str, iteration: u32) -> String {
    format!(
        "{DIAGRAM_GUIDELINES}\n\nUSER REQUEST: {request}\n\n\
         ITERATION {iteration}: Based on previous feedback, address these specific improvements:\n\
         {critique}\n\n\
         Generate an improved version that addresses all the critique points while \
         maintaining technical accuracy and professional quality."
    )
}

pub fn review_prompt(request: &str, doc_type: DocType, iteration: u32, max_iterations: u32) -> String {
    let threshold = doc_type.threshold();
    let mut rubric = String::new();
    let mut score_lines = String::new();
    for (idx, criterion) in CRITERIA.iter().enumerate() {
        rubric.push_str(&format!(
            "{}. **{}** (0-2 points) - {}\n",
            idx + 1,
            criterion.title(),
            criterion.hint()
        ));
        score_lines.push_str(&format!("{}: [0-2]/2\n", criterion.tag()));
    }

    format!(
        "You are an expert reviewer evaluating a technical diagram for publication quality.\n\n\
         ORIGINAL REQUEST: {request}\n\n\
         DOCUMENT TYPE: {doc_type} (quality threshold: {threshold:.1}/10)\n\
         ITERATION: {iteration}/{max_iterations}\n\n\
         Evaluate this diagram on these criteria:\n\n\
         {rubric}\n\
         RESPOND IN THIS EXACT FORMAT:\n\
         SCORE: [total score 0-10]\n\n\
         {score_lines}\n\
         STRENGTHS:\n- [strength 1]\n- [strength 2]\n\n\
         ISSUES:\n- [issue 1 if any]\n- [issue 2 if any]\n\n\
         VERDICT: [ACCEPTABLE or NEEDS_IMPROVEMENT]\n\n\
         If score >= {threshold:.1}, the diagram is ACCEPTABLE for {doc_type}.\n\
         If score < {threshold:.1}, mark as NEEDS_IMPROVEMENT with specific suggestions."
    )
}

//! Prompt text sent to the LLM for each analysis route.

use serde_json::Value;

/// Style records included verbatim in the general analysis prompt.
pub const PROMPT_STYLE_LIMIT: usize = 100;

pub const AI_ANALYSIS_MAX_TOKENS: u32 = 3000;
pub const DESIGN_ANALYSIS_MAX_TOKENS: u32 = 2000;

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

/// General quality review of a page: design, UX, accessibility, and code.
pub fn ai_analysis_prompt(
    url: &str,
    dom_styles: &[Value],
    accessibility: Option<&Value>,
) -> String {
    let shown = &dom_styles[..dom_styles.len().min(PROMPT_STYLE_LIMIT)];
    let truncated = if dom_styles.len() > PROMPT_STYLE_LIMIT {
        " ...(truncated)"
    } else {
        ""
    };
    let styles = pretty(&Value::Array(shown.to_vec()));
    let audit = accessibility.map(pretty).unwrap_or_else(|| "null".to_string());

    format!(
        r#"
You are an expert web developer, UI/UX designer, and accessibility consultant analyzing a website for overall quality and user experience.

Website URL: {url}

You have been given:
1. Computed style data for the most prominent page elements
2. Accessibility audit results from axe-core
3. A screenshot of the page, when one could be captured

Cover the following:

**Overall Design Quality:** visual hierarchy, typography consistency, color usage, layout, and visual balance.

**User Experience:** navigation clarity, interactive elements, content organization, and responsiveness.

**Accessibility:** put the axe-core findings in context, flag additional concerns, and suggest WCAG and semantic HTML improvements.

**Technical Implementation:** CSS maintainability, design system opportunities, and performance implications of the styles.

**Prioritized Recommendations:** high-impact fixes first, then medium-term improvements, then longer-term work, each with concrete implementation guidance.

DOM Style Data:
{styles}{truncated}

Accessibility Results:
{audit}

Give actionable, specific recommendations with implementation guidance.
"#
    )
}

/// Comparison of the live page against an intended design image.
pub fn design_analysis_prompt(url: &str, dom_styles: &[Value]) -> String {
    let styles = pretty(&Value::Array(dom_styles.to_vec()));

    format!(
        r#"
You are an expert UI/UX designer and web developer analyzing a website for design consistency and quality.

You have been given:
1. Computed style data extracted from the live website
2. A design image showing the intended result
3. The website URL: {url}

Analyze:

**Design Consistency:** compare the live styles with the design intent; identify spacing, typography, color, and alignment mismatches.

**Visual Hierarchy:** information hierarchy, visual weight of key elements, readability, and styling of buttons and other controls.

**Design System Compliance:** off-scale spacing, non-standard font sizes or weights, inconsistent radii or shadows, and color contrast.

**Recommendations:** specific improvements ordered by impact, suggesting design tokens where they apply.

DOM Style Data:
{styles}

Provide a structured analysis with specific recommendations for improvement.
"#
    )
}

//! Structured answer rendering
//!
//! Sections always appear in the same order: decision, confidence, amount,
//! reasoning, supporting clauses, key factors, recommendations, flags. Lists
//! that are empty leave out their whole section.

use crate::error::{Error, Result};
use crate::models::StructuredAnalysis;

use super::escape_html;

/// Parse a JSON answer and render it
///
/// Parsing happens before any markup is produced, so a bad answer never yields
/// a partial fragment.
pub fn render_structured(answer: &str) -> Result<String> {
    if answer.trim().is_empty() {
        return Err(Error::EmptyResponse);
    }
    let analysis = StructuredAnalysis::parse(answer)?;
    Ok(render_analysis(&analysis))
}

/// Render an already parsed analysis
pub fn render_analysis(analysis: &StructuredAnalysis) -> String {
    let justification = &analysis.justification;
    let factors = &justification.key_factors;

    let mut html = String::from(r#"<div class="response-content"><div class="response-section">"#);

    html.push_str(&format!(
        r#"<h3 class="decision {}">Decision: {}</h3>"#,
        escape_html(&analysis.decision.to_lowercase()),
        escape_html(&analysis.decision)
    ));
    html.push_str(&format!(
        r#"<p class="confidence {}">Confidence: {}</p>"#,
        escape_html(&analysis.confidence.to_lowercase()),
        escape_html(&analysis.confidence)
    ));

    if let Some(amount) = analysis.amount {
        html.push_str(&format!(r#"<p class="amount">Amount: ${:.2}</p>"#, amount));
    }

    html.push_str(&format!(
        r#"<div class="reasoning-section"><p><strong>Primary Reasoning:</strong> {}</p></div>"#,
        escape_html(&justification.primary_reasoning)
    ));

    if !justification.supporting_clauses.is_empty() {
        html.push_str(r#"<div class="clauses-section"><h4>Supporting Clauses:</h4><ul>"#);
        for clause in &justification.supporting_clauses {
            html.push_str(&format!(
                r#"<li class="clause"><strong>{}</strong><br><em>"{}"</em><br>Application: {}</li>"#,
                escape_html(&clause.clause_reference),
                escape_html(&clause.clause_text),
                escape_html(&clause.application)
            ));
        }
        html.push_str("</ul></div>");
    }

    html.push_str(r#"<div class="factors-section"><h4>Key Factors:</h4>"#);
    let entities = &factors.entity_analysis;
    if !entities.extracted_entities.is_empty() {
        html.push_str(r#"<div class="entities"><strong>Extracted Entities:</strong>"#);
        push_list(&mut html, &entities.extracted_entities);
        html.push_str("</div>");
    }
    if !entities.missing_information.is_empty() {
        html.push_str(r#"<div class="missing-info"><strong>Missing Information:</strong>"#);
        push_list(&mut html, &entities.missing_information);
        html.push_str("</div>");
    }
    html.push_str(&format!(
        "<p><strong>Rule Application:</strong> {}</p>",
        escape_html(&factors.rule_application)
    ));
    html.push_str(&format!(
        "<p><strong>Calculation Method:</strong> {}</p>",
        escape_html(&factors.calculation_method)
    ));
    html.push_str("</div>");

    if !analysis.recommendations.is_empty() {
        html.push_str(r#"<div class="recommendations-section"><h4>Recommendations:</h4>"#);
        push_list(&mut html, &analysis.recommendations);
        html.push_str("</div>");
    }

    if !analysis.flags.is_empty() {
        html.push_str(r#"<div class="flags-section"><h4>Flags:</h4>"#);
        push_list(&mut html, &analysis.flags);
        html.push_str("</div>");
    }

    html.push_str("</div></div>");
    html
}

fn push_list(html: &mut String, items: &[String]) {
    html.push_str("<ul>");
    for item in items {
        html.push_str("<li>");
        html.push_str(&escape_html(item));
        html.push_str("</li>");
    }
    html.push_str("</ul>");
}

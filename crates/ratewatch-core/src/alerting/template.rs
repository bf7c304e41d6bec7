//! Email rendering for threshold alerts

use chrono::{DateTime, Utc};

use crate::models::{AlertPayload, Condition, RateReading, ThresholdConfig};

/// Render the alert email for a breached condition
///
/// `detected_at` is the dispatch time, which can differ from
/// `rate.observed_at()`.
pub fn build_payload(
    rate: &RateReading,
    condition: Condition,
    thresholds: &ThresholdConfig,
    detected_at: DateTime<Utc>,
) -> AlertPayload {
    let pair = rate.pair();
    let current = format!("{:.4}", rate.conversion_rate());
    let threshold = match condition {
        Condition::AboveUpper => thresholds.upper,
        Condition::BelowLower => thresholds.lower,
    };
    let threshold = format!("{threshold:.4}");
    let range = format!("{:.4} - {:.4}", thresholds.lower, thresholds.upper);
    let detected = detected_at.to_rfc3339();
    let label = condition.label();

    let subject = format!("[RateWatch] {pair} {label}: {current}");

    let text_body = format!(
        "Exchange rate alert\n\
         \n\
         Currency pair:   {pair}\n\
         Current rate:    {current}\n\
         Condition:       {label}\n\
         Threshold:       {threshold}\n\
         Allowed range:   {range}\n\
         Detected at:     {detected}\n\
         Data source:     {source}\n",
        source = rate.source(),
    );

    let color = match condition {
        Condition::AboveUpper => "#dc3545",
        Condition::BelowLower => "#17a2b8",
    };

    let html_body = format!(
        "<html><body style=\"font-family: sans-serif\">\
         <h2 style=\"color: {color}\">{pair} {label}</h2>\
         <table cellpadding=\"4\">\
         <tr><td><b>Current rate</b></td><td>{current}</td></tr>\
         <tr><td><b>Threshold</b></td><td>{threshold}</td></tr>\
         <tr><td><b>Allowed range</b></td><td>{range}</td></tr>\
         <tr><td><b>Detected at</b></td><td>{detected}</td></tr>\
         <tr><td><b>Data source</b></td><td>{source}</td></tr>\
         </table>\
         <p style=\"color: #6c757d; font-size: small\">Sent by RateWatch</p>\
         </body></html>",
        source = escape_html(rate.source()),
    );

    AlertPayload {
        condition,
        subject,
        text_body,
        html_body,
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

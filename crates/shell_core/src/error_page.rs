//! Synthesized fallback document shown once every origin has failed.
//!
//! The page must render without any further network or asset access, so all
//! styling is inline and nothing is referenced by URL except the retry link.

use std::fmt::Write;

use crate::{AttemptRecord, AttemptResult};

/// Link target a viewer maps back to a retry request.
pub const RETRY_ACTION_URL: &str = "shell://retry";

const STYLE: &str = "body{font-family:Arial,sans-serif;text-align:center;padding:40px;\
background:#f5f5f5;color:#333}h1{color:#2196F3}ul{list-style:none;padding:0}\
li{margin:6px 0;font-size:14px;word-break:break-all}\
button{background:#2196F3;color:#fff;border:none;padding:12px 24px;border-radius:6px;\
font-size:16px;cursor:pointer;margin:10px}";

pub fn render(attempts: &[AttemptRecord]) -> String {
    let mut rows = String::new();
    for record in attempts {
        let reason = match &record.result {
            Some(AttemptResult::Failed(failure)) => failure.to_string(),
            Some(AttemptResult::Ready) => "loaded".to_string(),
            None => "not attempted".to_string(),
        };
        // Writing to a String cannot fail.
        let _ = write!(
            rows,
            "<li><strong>{}</strong>: {}</li>",
            escape_html(record.origin.locator()),
            escape_html(&reason)
        );
    }

    format!(
        "<!DOCTYPE html>\
<html><head><meta charset=\"UTF-8\">\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\
<title>Content unavailable</title><style>{STYLE}</style></head>\
<body><h1>Content unavailable</h1>\
<p>None of the content sources could be loaded.</p>\
<ul>{rows}</ul>\
<a href=\"{RETRY_ACTION_URL}\"><button id=\"retry\" onclick=\"return retryLoad()\">Retry</button></a>\
<script>function retryLoad(){{if(window.ContentShell&&ContentShell.retry){{ContentShell.retry();return false;}}return true;}}</script>\
</body></html>"
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

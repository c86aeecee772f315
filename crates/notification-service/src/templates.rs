use crate::{Alert, AlertType};

pub struct EmailTemplate;

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl EmailTemplate {
    pub fn render(alert: &Alert) -> String {
        let body_content = match &alert.alert_type {
            AlertType::ScanDigest {
                digest,
                qualified,
                best_score,
            } => {
                let best = best_score
                    .map(|s| format!("{s}/100"))
                    .unwrap_or_else(|| "—".to_string());
                format!(
                    r#"<div style="background:#1e293b;color:#fff;padding:12px 20px;border-radius:8px 8px 0 0;font-size:18px;font-weight:700;">SmartValue Scanner</div>
<table style="width:100%;border-collapse:collapse;">
  <tr><td style="padding:8px 12px;color:#94a3b8;">Opportunités</td><td style="padding:8px 12px;font-weight:600;">{qualified}</td></tr>
  <tr style="background:#f8fafc;"><td style="padding:8px 12px;color:#94a3b8;">Meilleur score</td><td style="padding:8px 12px;font-weight:600;">{best}</td></tr>
</table>
<pre style="margin:0;padding:16px 20px;white-space:pre-wrap;font-size:13px;color:#334155;">{}</pre>"#,
                    escape_html(digest)
                )
            }
            AlertType::NoOpportunities { requested } => {
                format!(
                    r#"<div style="background:#94a3b8;color:#fff;padding:12px 20px;border-radius:8px 8px 0 0;font-size:18px;font-weight:700;">SmartValue Scanner</div>
<div style="padding:16px 20px;">
  <p style="color:#334155;font-weight:600;font-size:16px;margin:0 0 8px;">Aucune opportunité cette fois-ci</p>
  <p style="color:#64748b;margin:0;">{requested} tickers analysés, aucun ne passe les filtres.</p>
</div>"#
                )
            }
        };

        format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1"></head>
<body style="margin:0;padding:0;background:#f1f5f9;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;">
<table width="100%" cellpadding="0" cellspacing="0" style="background:#f1f5f9;padding:32px 0;">
  <tr><td align="center">
    <table width="600" cellpadding="0" cellspacing="0" style="background:#ffffff;border-radius:8px;overflow:hidden;box-shadow:0 1px 3px rgba(0,0,0,0.1);">
      <tr><td>
        {body_content}
      </td></tr>
      <tr><td style="padding:16px 20px;border-top:1px solid #e2e8f0;">
        <p style="margin:0;color:#94a3b8;font-size:12px;">
          {msg}
          <br>Envoyé le {ts} UTC
        </p>
      </td></tr>
    </table>
  </td></tr>
</table>
</body>
</html>"#,
            msg = escape_html(&alert.message),
            ts = alert.timestamp.format("%Y-%m-%d %H:%M:%S"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_escaped_inside_pre() {
        let alert = Alert::new(
            AlertType::ScanDigest {
                digest: "## 1) 🔥 A&B <Tech>".to_string(),
                qualified: 1,
                best_score: Some(71.2),
            },
            "SmartValue Scanner",
            "1 opportunité",
        );
        let html = EmailTemplate::render(&alert);
        assert!(html.contains("A&amp;B &lt;Tech&gt;</pre>"));
        assert!(html.contains("71.2/100"));
    }

    #[test]
    fn test_empty_scan_template() {
        let alert = Alert::new(
            AlertType::NoOpportunities { requested: 63 },
            "SmartValue Scanner",
            "0 opportunité",
        );
        let html = EmailTemplate::render(&alert);
        assert!(html.contains("63 tickers analysés"));
        assert!(!html.contains("<pre"));
    }
}

use value_core::ResultRecord;

pub const DIGEST_TITLE: &str = "# 🔎 SmartValue Scanner | Sélection du moment";

pub const SOFT_DISCLAIMER: &str = "ℹ️ Ces résultats sont fournis à titre indicatif pour vous aider dans votre réflexion et vos choix. \
Ils ne remplacent pas une analyse complète (rapports, contexte du secteur, risques, valorisation). \
Si une opportunité vous intéresse, prenez le temps de compléter vos recherches avant toute décision.";

/// Shortest exact decimal, keeping ".0" on whole numbers (84.0, 123.45).
pub(crate) fn format_number(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 {
        format!("{x:.1}")
    } else {
        x.to_string()
    }
}

pub(crate) fn show(v: Option<f64>) -> String {
    v.map_or_else(|| "—".to_string(), format_number)
}

/// Render the first `top_n` records (already ranked) as a markdown digest.
/// The disclaimer is always appended, even for an empty list.
pub fn to_digest(results: &[ResultRecord], top_n: usize) -> String {
    let mut lines = vec![format!("{DIGEST_TITLE}\n")];

    for (i, r) in results.iter().take(top_n).enumerate() {
        lines.push(format!(
            "## {}) {} {} ({}) | Score {}/100 | Confiance {} {}%\n",
            i + 1,
            r.score_tier.badge(),
            r.ticker,
            r.sector,
            format_number(r.score),
            r.confidence_tier.badge(),
            format_number(r.confidence)
        ));
        lines.push(format!("- Prix: {} {}", format_number(r.price), r.currency));
        if let Some(pe) = r.pe {
            lines.push(format!(
                "- PER: {} | ROE: {}% | Marge: {}%",
                format_number(pe),
                show(r.roe_pct),
                show(r.margin_pct)
            ));
        }
        lines.push(format!(
            "- Dette/Equity: {} | Dividende: {}% | Croissance CA: {}%",
            show(r.debt_to_equity),
            r.dividend_display,
            show(r.revenue_growth_pct)
        ));
        lines.push(format!("- Tags: {}", r.tags_display));
        lines.push(format!("- Résumé: {}", r.summary));
        lines.push(format!("- Pourquoi: {}\n", r.why_display()));
    }

    lines.push(format!("> {SOFT_DISCLAIMER}\n"));
    lines.join("\n")
}

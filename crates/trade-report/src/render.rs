use analysis_core::{Bias, FundamentalHealth, Regime, Structure, TradeReport};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// ANSI styling that collapses to plain text when disabled
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("{}{}{}", code, text, RESET)
        } else {
            text.to_string()
        }
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn heading(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn bias(&self, bias: Bias, text: &str) -> String {
        match bias {
            Bias::Bullish => self.green(text),
            Bias::Bearish => self.red(text),
            Bias::Neutral => self.paint(YELLOW, text),
        }
    }
}

/// `$1,234.56`; negatives as `-$1,234.56`
pub fn format_money(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, frac_part)
}

/// Plain-text trade report in eight numbered sections.
pub fn render(report: &TradeReport, risk_percent: f64, palette: Palette) -> String {
    let p = palette;
    let snap = &report.snapshot;
    let signals = &report.signals;
    let sizing = &report.sizing;
    let mut lines: Vec<String> = Vec::new();

    let spot = format_money(report.price);
    let spot = match signals.regime() {
        Regime::Bullish => p.green(&spot),
        Regime::Bearish => p.red(&spot),
    };

    lines.push(format!(
        "1. Ticker: {} | Spot: {} | As of: {}",
        report.symbol,
        spot,
        report.as_of.format("%Y-%m-%d")
    ));
    lines.push(format!(
        "2. SR Levels: [S: {} | R: {}]",
        format_money(snap.support20),
        format_money(snap.resistance20)
    ));
    lines.push(String::new());

    let regime = match signals.regime() {
        Regime::Bullish => p.green("Bullish"),
        Regime::Bearish => p.red("Bearish"),
    };
    let structure = match signals.structure() {
        Structure::Consolidation => "Range",
        Structure::WideRange => "Wide Range",
    };
    lines.push(p.heading("3. TECHNICAL NOTATION"));
    lines.push(format!("Regime: {} | Structure: {}", regime, structure));
    lines.push(String::new());

    let distance = format!("{:.2}%", signals.ema_distance_pct);
    let distance = if signals.ema_distance_pct > 0.0 { p.green(&distance) } else { p.red(&distance) };
    lines.push(p.heading("4. TREND DYNAMICS"));
    lines.push(format!("EMA distance: {} | Mean: {}", distance, format_money(snap.ema200)));
    lines.push(String::new());

    let volume = if signals.is_volume_surge { "Surge" } else { "Normal" };
    lines.push(p.heading("5. PRICE ACTION"));
    lines.push(format!(
        "RSI: {:.1} | Volume: {} ({:.2}x) | ATR: {}",
        snap.rsi14,
        volume,
        snap.volume_ratio20,
        format_money(snap.atr14)
    ));
    lines.push(String::new());

    let units = format!("{:.4} units", sizing.position_size);
    lines.push(p.heading("6. RISK MANAGEMENT"));
    lines.push(format!(
        "Risk: {} ({}%) | Stop: {}",
        p.red(&format_money(sizing.risk_amount)),
        risk_percent,
        p.red(&format_money(sizing.stop_price))
    ));
    lines.push(format!("Position: {} (~{})", p.green(&units), format_money(sizing.position_value)));
    lines.push(String::new());

    let action = report.recommendation.action;
    lines.push(format!("{} {}", p.heading("7. STRATEGY:"), p.bias(action.bias(), action.label())));
    for warning in &report.recommendation.warnings {
        let text = format!("!! {} !!", warning.label().to_uppercase());
        lines.push(p.bias(warning.bias(), &text));
    }
    lines.push(String::new());

    lines.push(p.heading("8. QUICK SUMMARY"));
    lines.push(format!("• Position: {}", p.green(&units)));
    lines.push(format!(
        "• Risk/Gain: {} / {}",
        p.red(&format_money(sizing.risk_amount)),
        p.green(&format_money(sizing.potential_profit))
    ));
    if sizing.potential_profit > 0.0 {
        let ratio = format!("1 : {:.2}", sizing.reward_risk_ratio);
        lines.push(format!("• R/R Ratio: {} | Target: {:.1}%", p.green(&ratio), sizing.target_pct));
    }
    lines.push(format!(
        "• Target: {} | Stop: {}",
        format_money(sizing.target_price),
        format_money(sizing.stop_price)
    ));

    if let Some(assessment) = &report.fundamentals {
        let health = match assessment.health {
            FundamentalHealth::Healthy => p.green("Healthy"),
            FundamentalHealth::Weak => p.red("Weak"),
        };
        let margin = |m: Option<f64>| m.map(|v| format!("{:.1}%", v)).unwrap_or_else(|| "n/a".to_string());
        lines.push(format!(
            "• Fundamentals: {} | Op margin: {} | Net margin: {}",
            health,
            margin(assessment.figures.operating_margin),
            margin(assessment.figures.net_margin)
        ));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

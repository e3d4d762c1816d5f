use analysis_core::{FundamentalHealth, Fundamentals, FundamentalsAssessment, Financials};

/// Margin-based health check over the latest reported period.
///
/// Kept separate from the indicator pipeline: it only ever adds a warning to a
/// report, it never changes the action.
pub struct FundamentalAnalysisEngine;

impl FundamentalAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    fn calculate_gross_margin(&self, gross_profit: f64, revenue: f64) -> Option<f64> {
        if revenue > 0.0 {
            Some((gross_profit / revenue) * 100.0)
        } else {
            None
        }
    }

    fn calculate_operating_margin(&self, operating_income: f64, revenue: f64) -> Option<f64> {
        if revenue > 0.0 {
            Some((operating_income / revenue) * 100.0)
        } else {
            None
        }
    }

    fn calculate_profit_margin(&self, net_income: f64, revenue: f64) -> Option<f64> {
        if revenue > 0.0 {
            Some((net_income / revenue) * 100.0)
        } else {
            None
        }
    }

    /// Revenue and margins for one period. Margins need positive revenue.
    pub fn figures(&self, financials: &Financials) -> Fundamentals {
        let revenue = financials.revenue;
        let margin = |value: Option<f64>, f: fn(&Self, f64, f64) -> Option<f64>| {
            value.zip(revenue).and_then(|(v, r)| f(self, v, r))
        };

        Fundamentals {
            revenue,
            gross_margin: margin(financials.gross_profit, Self::calculate_gross_margin),
            operating_margin: margin(financials.operating_income, Self::calculate_operating_margin),
            net_margin: margin(financials.net_income, Self::calculate_profit_margin),
        }
    }

    /// Weak when revenue is not positive or either operating or net margin is negative.
    pub fn classify(&self, figures: &Fundamentals) -> Option<FundamentalHealth> {
        let has_figures = figures.revenue.is_some()
            || figures.operating_margin.is_some()
            || figures.net_margin.is_some();
        if !has_figures {
            return None;
        }

        let weak = figures.revenue.is_some_and(|r| r <= 0.0)
            || figures.operating_margin.is_some_and(|m| m < 0.0)
            || figures.net_margin.is_some_and(|m| m < 0.0);

        Some(if weak { FundamentalHealth::Weak } else { FundamentalHealth::Healthy })
    }

    pub fn assess(&self, financials: &Financials) -> Option<FundamentalsAssessment> {
        let figures = self.figures(financials);
        let health = self.classify(&figures)?;
        tracing::debug!(
            "Fundamentals for {} ({} {}): {:?}",
            financials.symbol,
            financials.fiscal_period,
            financials.fiscal_year,
            health
        );
        Some(FundamentalsAssessment { figures, health })
    }
}

impl Default for FundamentalAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

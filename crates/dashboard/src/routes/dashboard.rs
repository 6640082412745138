//! Dashboard overview route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::{
    data::{CardData, LatestInvoice, Revenue},
    error::AppError,
    filters,
    middleware::RequireAuth,
    state::AppState,
};

/// Height of the revenue chart in pixels.
const CHART_HEIGHT: i64 = 350;

/// Revenue month view for the chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevenueBar {
    pub month: String,
    pub height_px: i64,
}

/// The revenue chart: y-axis labels from the top down and one bar per month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevenueChart {
    pub y_axis: Vec<String>,
    pub bars: Vec<RevenueBar>,
}

impl RevenueChart {
    /// Scale the bars against the highest month rounded up to the next thousand.
    ///
    /// Negative months draw as empty bars.
    #[must_use]
    pub fn new(revenue: &[Revenue]) -> Self {
        let highest = revenue.iter().map(|r| r.revenue.max(0)).max().unwrap_or(0);
        let top_label = highest.saturating_add(999) / 1000 * 1000;

        let y_axis = (0..=top_label / 1000)
            .rev()
            .map(|k| format!("${k}K"))
            .collect();

        let bars = revenue
            .iter()
            .map(|r| RevenueBar {
                month: r.month.clone(),
                height_px: bar_height(r.revenue, top_label),
            })
            .collect();

        Self { y_axis, bars }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Bar height in pixels for `revenue` on a chart topped at `top_label`.
fn bar_height(revenue: i64, top_label: i64) -> i64 {
    if top_label <= 0 {
        return 0;
    }
    let scaled = i128::from(CHART_HEIGHT) * i128::from(revenue.max(0)) / i128::from(top_label);
    i64::try_from(scaled.clamp(0, i128::from(CHART_HEIGHT))).unwrap_or(CHART_HEIGHT)
}

/// Dashboard overview template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/overview.html")]
pub struct OverviewTemplate {
    pub current_path: &'static str,
    pub user_email: String,
    pub cards: CardData,
    pub chart: RevenueChart,
    pub latest_invoices: Vec<LatestInvoice>,
}

/// Dashboard overview handler.
///
/// Never served from the render cache: card totals are recomputed on every
/// request.
#[instrument(skip_all)]
pub async fn overview(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<OverviewTemplate, AppError> {
    let data = state.data();
    let (revenue, latest_invoices, cards) = tokio::try_join!(
        data.fetch_revenue(),
        data.fetch_latest_invoices(),
        data.fetch_card_data(),
    )?;

    Ok(OverviewTemplate {
        current_path: "/dashboard",
        user_email: user.email.to_string(),
        cards,
        chart: RevenueChart::new(&revenue),
        latest_invoices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(month: &str, revenue: i64) -> Revenue {
        Revenue {
            month: month.to_string(),
            revenue,
        }
    }

    #[test]
    fn test_chart_rounds_top_label_up() {
        let chart = RevenueChart::new(&[month("Jan", 2000), month("Feb", 4800)]);
        assert_eq!(chart.y_axis, vec!["$5K", "$4K", "$3K", "$2K", "$1K", "$0K"]);
        assert_eq!(chart.bars[0].height_px, 140);
        assert_eq!(chart.bars[1].height_px, 336);
    }

    #[test]
    fn test_chart_clamps_negative_and_extreme_months() {
        let chart = RevenueChart::new(&[month("Jan", -500), month("Feb", 1000)]);
        assert_eq!(chart.bars[0].height_px, 0);
        assert_eq!(chart.bars[1].height_px, 350);
        assert_eq!(chart.y_axis, vec!["$1K", "$0K"]);

        assert_eq!(bar_height(i64::MAX, i64::MAX / 1000 * 1000), 350);
        assert_eq!(bar_height(i64::MAX / 2, i64::MAX / 1000 * 1000), 175);
        assert_eq!(bar_height(i64::MIN, 1000), 0);
    }

    #[test]
    fn test_chart_without_revenue() {
        let chart = RevenueChart::new(&[]);
        assert!(chart.is_empty());
        assert_eq!(chart.y_axis, vec!["$0K"]);
    }
}

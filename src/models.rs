use serde::Serialize;
use crate::services::excel::types::{DayRange, SheetPreview};

/// Summary card: a formatted value and, when a previous period exists, the
/// previous value and the change against it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCard {
    pub title: String,
    pub value: f64,
    pub display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallMetrics {
    pub total_incoming: f64,
    pub total_accepted: f64,
    pub total_missed: f64,
    pub acceptance_rate: f64,
    pub cards: Vec<MetricCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdSpendMetrics {
    pub target_ads_spend: f64,
    pub leads: f64,
    pub visits: f64,
    pub deliveries: f64,
    pub cost_per_lead: f64,
    pub cost_per_visit: f64,
    pub cost_per_delivery: f64,
    pub cards: Vec<MetricCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallDynamics {
    pub title: String,
    pub days: Vec<usize>,
    pub series: Vec<Series>,
    pub y_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledValue {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelStage {
    pub label: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_of_previous: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Funnel {
    pub title: String,
    pub stages: Vec<FunnelStage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffBreakdown {
    pub title: String,
    pub forwarded: Vec<LabeledValue>,
    pub share: Vec<PieSlice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InternetLeads {
    pub title: String,
    pub slices: Vec<PieSlice>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdherenceBand {
    Red,
    Orange,
    Green,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptBar {
    pub manager: String,
    pub percent: f64,
    pub band: AdherenceBand,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptAdherence {
    pub title: String,
    pub bars: Vec<ScriptBar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectionReasons {
    pub title: String,
    pub reasons: Vec<LabeledValue>,
}

/// Everything one render produces. Sections that were switched off, had no
/// data, or failed are left out.
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub sheet: String,
    pub previous_sheet: Option<String>,
    pub day_range: DayRange,
    pub max_day: usize,
    pub selected_columns: Vec<String>,
    pub has_previous_period: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_metrics: Option<CallMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_spend: Option<AdSpendMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_preview: Option<SheetPreview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamics: Option<CallDynamics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funnel: Option<Funnel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff: Option<StaffBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internet: Option<InternetLeads>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scripts: Option<ScriptAdherence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_funnel: Option<Funnel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasons: Option<RejectionReasons>,
}

use crate::error::AppError;
use crate::models::*;
use crate::services::excel::types::{AggregatedTable, DayRange, IndicatorTable};
use super::extractor::{average_fraction, find_daily_series, find_exact, find_scalar, sum_matching};

pub const INCOMING: &str = "Входящие звонки - ВЗ";
pub const ACCEPTED: &str = "Принятые ВЗ";
pub const MISSED: &str = "Непринятые ВЗ";
pub const FORWARDED: &str = "Переадресованные успешно ВЗ";

pub const STAFF: [&str; 3] = ["Зарема", "Мади", "Алишер"];
const CALL_SOURCES: [&str; 5] = ["Зарема", "Мади", "Алишер", "Думан", "ИНТЕРНЕТ ЗАЯВКИ - ИЗ"];
const INTERNET_STATUSES: [&str; 3] = ["Дозвонились ИЗ", "Не обработаны ИЗ", "Не дозвонились ИЗ"];

const REJECTION_HEADER: &str = "ОТКАЗЫ";
const REJECTION_FALLBACK_ROW: usize = 37;
const REJECTION_KEYWORDS: [&str; 8] = [
    "заявку", "купил", "авто", "не", "отказ", "ошибочно", "телефон", "без",
];
const MAX_REJECTION_REASONS: usize = 10;

pub const CURRENCY: &str = "₸";

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 { numerator / denominator } else { 0.0 }
}

/// Accepted share of incoming calls in percent, one decimal.
pub fn acceptance_rate(accepted: f64, incoming: f64) -> f64 {
    if incoming > 0.0 { round1(accepted / incoming * 100.0) } else { 0.0 }
}

pub fn format_count(value: f64) -> String {
    format!("{}", value.trunc() as i64)
}

/// `12,345₸`
pub fn format_currency(value: f64) -> String {
    let rounded = value.round_ties_even() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if rounded < 0 { "-" } else { "" };
    format!("{}{}{}", sign, grouped, CURRENCY)
}

fn days_title(title: &str, range: DayRange) -> String {
    format!("{} (Дни {}-{})", title, range.start, range.end)
}

fn card(title: &str, value: f64, display: String, previous: Option<f64>) -> MetricCard {
    MetricCard {
        title: title.to_string(),
        value,
        display,
        previous,
        delta: previous.map(|p| value - p),
    }
}

pub fn call_metrics(current: &AggregatedTable, previous: Option<&AggregatedTable>) -> CallMetrics {
    let total_incoming = find_scalar(current, INCOMING);
    let total_accepted = find_scalar(current, ACCEPTED);
    let total_missed = find_scalar(current, MISSED);
    let rate = acceptance_rate(total_accepted, total_incoming);

    let prev = |fragment: &str| previous.map(|p| find_scalar(p, fragment));
    let prev_rate = previous.map(|p| acceptance_rate(find_scalar(p, ACCEPTED), find_scalar(p, INCOMING)));

    let cards = vec![
        card("Всего входящих", total_incoming, format_count(total_incoming), prev(INCOMING)),
        card("Принято звонков", total_accepted, format_count(total_accepted), prev(ACCEPTED)),
        card("Процент принятых", rate, format!("{:.1}%", rate), prev_rate),
        card("Пропущено", total_missed, format_count(total_missed), prev(MISSED)),
    ];

    CallMetrics {
        total_incoming,
        total_accepted,
        total_missed,
        acceptance_rate: rate,
        cards,
    }
}

pub fn ad_spend_metrics(current: &AggregatedTable) -> AdSpendMetrics {
    let target_ads_spend = find_scalar(current, "Траты на таргет");
    let leads = find_scalar(current, "Лиды (ИЗ)");
    let visits = find_scalar(current, "Визиты");
    let deliveries = find_scalar(current, "Выдачи");

    let cost_per_lead = ratio(target_ads_spend, leads);
    let cost_per_visit = ratio(target_ads_spend, visits);
    let cost_per_delivery = ratio(target_ads_spend, deliveries);

    let cards = vec![
        card("Траты на таргет", target_ads_spend, format_currency(target_ads_spend), None),
        card("Стоимость лида (ИЗ)", cost_per_lead, format_currency(cost_per_lead), None),
        card("Стоимость визита", cost_per_visit, format_currency(cost_per_visit), None),
        card("Стоимость выдачи", cost_per_delivery, format_currency(cost_per_delivery), None),
    ];

    AdSpendMetrics {
        target_ads_spend,
        leads,
        visits,
        deliveries,
        cost_per_lead,
        cost_per_visit,
        cost_per_delivery,
        cards,
    }
}

/// Daily incoming/accepted/missed/forwarded series for the period.
pub fn call_dynamics(table: &IndicatorTable, columns: &[usize], range: DayRange) -> Result<CallDynamics, AppError> {
    let days = range.days();
    let series: Vec<Series> = [
        ("Входящие", INCOMING),
        ("Принятые", ACCEPTED),
        ("Непринятые", MISSED),
        ("Переадресованные успешно", FORWARDED),
    ]
    .iter()
    .map(|(name, fragment)| Series {
        name: name.to_string(),
        values: find_daily_series(table, fragment, columns),
    })
    .collect();

    if let Some(bad) = series.iter().find(|s| s.values.len() != days.len()) {
        return Err(AppError::Metric(format!(
            "Series '{}' has {} values for {} days",
            bad.name,
            bad.values.len(),
            days.len()
        )));
    }

    let peak = series.iter()
        .flat_map(|s| s.values.iter().copied())
        .fold(0.0, f64::max);

    Ok(CallDynamics {
        title: days_title("Динамика входящих звонков по дням", range),
        days,
        series,
        y_max: peak + 5.0,
    })
}

pub fn processing_funnel(current: &AggregatedTable, range: DayRange) -> Funnel {
    let stages = [
        ("Всего входящих", INCOMING, "#1976D2"),
        ("Принятые ВЗ", ACCEPTED, "green"),
        ("Переадресованные успешно ВЗ", FORWARDED, "yellow"),
        ("Непринятые ВЗ", MISSED, "red"),
    ]
    .iter()
    .map(|(label, fragment, color)| FunnelStage {
        label: label.to_string(),
        value: find_scalar(current, fragment),
        percent_of_previous: None,
        color: Some(*color),
    })
    .collect();

    Funnel {
        title: days_title("Воронка обработки звонков", range),
        stages,
    }
}

fn pie(values: Vec<LabeledValue>) -> Vec<PieSlice> {
    let total: f64 = values.iter().map(|v| v.value).sum();
    values.into_iter()
        .map(|v| PieSlice {
            share: ratio(v.value, total),
            label: v.label,
            value: v.value,
        })
        .collect()
}

/// Successfully forwarded calls per staff member, matched by exact label.
pub fn staff_breakdown(current: &AggregatedTable, range: DayRange) -> Option<StaffBreakdown> {
    let forwarded: Vec<LabeledValue> = find_exact(current, &STAFF)
        .into_iter()
        .map(|row| LabeledValue {
            label: row.label.clone().unwrap_or_default(),
            value: row.period_sum,
        })
        .collect();

    if forwarded.is_empty() {
        return None;
    }

    Some(StaffBreakdown {
        title: days_title("Переадресовано успешно ВЗ по сотрудникам", range),
        share: pie(forwarded.clone()),
        forwarded,
    })
}

pub fn internet_leads(current: &AggregatedTable, range: DayRange) -> Option<InternetLeads> {
    let values: Vec<LabeledValue> = INTERNET_STATUSES.iter()
        .map(|label| LabeledValue {
            label: label.to_string(),
            value: find_scalar(current, label),
        })
        .collect();

    if values.iter().all(|v| v.value == 0.0) {
        return None;
    }

    Some(InternetLeads {
        title: days_title("Распределение интернет-заявок (ИЗ)", range),
        slices: pie(values),
    })
}

fn adherence_band(percent: f64) -> AdherenceBand {
    if percent < 50.0 {
        AdherenceBand::Red
    } else if percent < 80.0 {
        AdherenceBand::Orange
    } else {
        AdherenceBand::Green
    }
}

/// Average script adherence per manager over the period, in percent.
pub fn script_adherence(table: &IndicatorTable, columns: &[usize], range: DayRange) -> ScriptAdherence {
    let bars = STAFF.iter()
        .map(|name| {
            let fragment = format!("Выполнение скрипта {}", name);
            let percent = average_fraction(table, &fragment, columns) * 100.0;
            ScriptBar {
                manager: name.to_string(),
                percent: round1(percent),
                band: adherence_band(percent),
            }
        })
        .collect();

    ScriptAdherence {
        title: days_title("Выполнение скрипта по менеджерам", range),
        bars,
    }
}

pub fn sales_funnel(current: &AggregatedTable, range: DayRange) -> Option<Funnel> {
    let total_calls: f64 = CALL_SOURCES.iter().map(|source| find_scalar(current, source)).sum();

    let values = [
        ("Общие звонки", total_calls),
        ("Визиты", find_scalar(current, "Визиты")),
        ("Тест-драйвы", find_scalar(current, "Тест-драйвы")),
        ("Коммерческие предложения", find_scalar(current, "КОММЕРЧЕСКОЕ ПРЕДЛОЖЕНИЕ")),
        ("Контракты", sum_matching(current, "Контракт")),
        ("Выдачи", sum_matching(current, "Выдач")),
    ];

    if values.iter().all(|(_, v)| *v == 0.0) {
        return None;
    }

    let stages = values.iter()
        .enumerate()
        .map(|(i, (label, value))| FunnelStage {
            label: label.to_string(),
            value: *value,
            percent_of_previous: i.checked_sub(1)
                .map(|prev| values[prev].1)
                .filter(|prev| *prev > 0.0)
                .map(|prev| round1(value / prev * 100.0)),
            color: None,
        })
        .collect();

    Some(Funnel {
        title: days_title("Воронка продаж", range),
        stages,
    })
}

fn is_upper_label(label: &str) -> bool {
    label.chars().any(char::is_uppercase) && !label.chars().any(char::is_lowercase)
}

/// True for the header row of the next section after the rejection list.
fn is_section_boundary(label: &str) -> bool {
    let lower = label.to_lowercase();
    is_upper_label(label)
        && label.chars().count() > 3
        && !REJECTION_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Rejection reasons listed under the `ОТКАЗЫ` header, largest ten, in
/// ascending order.
pub fn rejection_reasons(table: &IndicatorTable, current: &AggregatedTable, range: DayRange) -> Option<RejectionReasons> {
    let start = table.rows.iter()
        .position(|row| !row.label.is_empty()
            && row.label.to_string().to_uppercase().contains(REJECTION_HEADER))
        .map(|header| header + 1)
        .unwrap_or_else(|| {
            tracing::debug!("No '{}' header, scanning from row {}", REJECTION_HEADER, REJECTION_FALLBACK_ROW);
            REJECTION_FALLBACK_ROW
        });

    let mut reasons = Vec::new();
    for row in table.rows.iter().skip(start) {
        let label = row.label.to_string();
        let label = label.trim();
        if label.is_empty() {
            continue;
        }
        if is_section_boundary(label) {
            break;
        }
        let value = find_scalar(current, label);
        if value > 0.0 {
            reasons.push(LabeledValue { label: label.to_string(), value });
        }
    }

    if reasons.is_empty() {
        return None;
    }

    reasons.sort_by(|a, b| a.value.total_cmp(&b.value));
    if reasons.len() > MAX_REJECTION_REASONS {
        reasons = reasons.split_off(reasons.len() - MAX_REJECTION_REASONS);
    }

    Some(RejectionReasons {
        title: days_title("Причины отказа", range),
        reasons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::excel::types::Cell;
    use crate::services::metrics::aggregator::aggregate;
    use crate::services::metrics::test_support::{aggregated, table};
    use pretty_assertions::assert_eq;

    fn numbers(values: &[f64]) -> Vec<Cell> {
        values.iter().map(|&v| Cell::Number(v)).collect()
    }

    #[test]
    fn acceptance_rate_over_two_days() {
        let t = table(&[
            (INCOMING, numbers(&[10.0, 20.0])),
            (ACCEPTED, numbers(&[8.0, 15.0])),
        ]);
        let agg = aggregate(&t, &[2, 3]);
        let metrics = call_metrics(&agg, None);
        assert_eq!(metrics.total_incoming, 30.0);
        assert_eq!(metrics.total_accepted, 23.0);
        assert_eq!(metrics.acceptance_rate, 76.7);
        assert_eq!(metrics.cards[2].display, "76.7%");
        assert_eq!(metrics.cards[0].delta, None);
    }

    #[test]
    fn acceptance_rate_is_zero_without_incoming() {
        assert_eq!(acceptance_rate(5.0, 0.0), 0.0);
    }

    #[test]
    fn halves_round_to_even() {
        assert_eq!(acceptance_rate(1.0, 16.0), 6.2);
        assert_eq!(acceptance_rate(3.0, 16.0), 18.8);
        assert_eq!(round1(0.25), 0.2);
        assert_eq!(format_currency(2.5), "2₸");
        assert_eq!(format_currency(3.5), "4₸");
    }

    #[test]
    fn call_metrics_compare_with_previous_period() {
        let current = aggregated(&[(INCOMING, 30.0), (ACCEPTED, 20.0)]);
        let previous = aggregated(&[(INCOMING, 25.0), (ACCEPTED, 20.0)]);
        let metrics = call_metrics(&current, Some(&previous));
        assert_eq!(metrics.cards[0].previous, Some(25.0));
        assert_eq!(metrics.cards[0].delta, Some(5.0));
        assert_eq!(metrics.cards[2].previous, Some(80.0));
    }

    #[test]
    fn currency_uses_thousand_separators() {
        assert_eq!(format_currency(0.0), "0₸");
        assert_eq!(format_currency(999.4), "999₸");
        assert_eq!(format_currency(1234567.0), "1,234,567₸");
        assert_eq!(format_currency(-1500.0), "-1,500₸");
    }

    #[test]
    fn ad_spend_costs_guard_zero_divisors() {
        let agg = aggregated(&[("Траты на таргет", 100000.0), ("Лиды (ИЗ)", 40.0), ("Визиты", 0.0)]);
        let spend = ad_spend_metrics(&agg);
        assert_eq!(spend.cost_per_lead, 2500.0);
        assert_eq!(spend.cost_per_visit, 0.0);
        assert_eq!(spend.cost_per_delivery, 0.0);
        assert_eq!(spend.cards[0].display, "100,000₸");
        assert_eq!(spend.cards[1].display, "2,500₸");
    }

    #[test]
    fn dynamics_follow_the_day_range() {
        let t = table(&[
            (INCOMING, numbers(&[10.0, 20.0, 30.0])),
            (FORWARDED, numbers(&[1.0, 2.0, 3.0])),
        ]);
        let dynamics = call_dynamics(&t, &[3, 4], DayRange::new(2, 3)).unwrap();
        assert_eq!(dynamics.days, vec![2, 3]);
        assert_eq!(dynamics.series[0].values, vec![20.0, 30.0]);
        assert_eq!(dynamics.series[2].values, vec![0.0, 0.0]);
        assert_eq!(dynamics.series[3].values, vec![2.0, 3.0]);
        assert_eq!(dynamics.y_max, 35.0);
        assert_eq!(dynamics.title, "Динамика входящих звонков по дням (Дни 2-3)");
    }

    #[test]
    fn dynamics_reject_mismatched_columns() {
        let t = table(&[(INCOMING, numbers(&[10.0, 20.0, 30.0]))]);
        let result = call_dynamics(&t, &[2], DayRange::new(1, 3));
        assert!(matches!(result, Err(AppError::Metric(_))));
    }

    #[test]
    fn processing_funnel_has_four_stages() {
        let agg = aggregated(&[(INCOMING, 30.0), (ACCEPTED, 23.0), (MISSED, 7.0), (FORWARDED, 4.0)]);
        let funnel = processing_funnel(&agg, DayRange::new(1, 2));
        let values: Vec<f64> = funnel.stages.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![30.0, 23.0, 4.0, 7.0]);
    }

    #[test]
    fn staff_breakdown_uses_exact_names() {
        let agg = aggregated(&[("Зарема", 6.0), ("Выполнение скрипта Мади", 0.9), ("Алишер", 2.0)]);
        let staff = staff_breakdown(&agg, DayRange::new(1, 5)).unwrap();
        assert_eq!(staff.forwarded.len(), 2);
        assert_eq!(staff.share[0].share, 0.75);

        let none = aggregated(&[("Думан", 3.0)]);
        assert!(staff_breakdown(&none, DayRange::new(1, 5)).is_none());
    }

    #[test]
    fn internet_leads_skip_empty_period() {
        let agg = aggregated(&[("Дозвонились ИЗ", 0.0)]);
        assert!(internet_leads(&agg, DayRange::new(1, 1)).is_none());

        let agg = aggregated(&[("Дозвонились ИЗ", 3.0), ("Не обработаны ИЗ", 1.0)]);
        let leads = internet_leads(&agg, DayRange::new(1, 1)).unwrap();
        assert_eq!(leads.slices[0].value, 3.0);
        assert_eq!(leads.slices[0].share, 0.75);
    }

    #[test]
    fn script_adherence_bands() {
        let t = table(&[
            ("Выполнение скрипта Зарема", vec![Cell::text("40%"), Cell::text("50%")]),
            ("Выполнение скрипта Мади", numbers(&[0.7, 0.8])),
            ("Выполнение скрипта Алишер", numbers(&[0.9, 1.0])),
        ]);
        let scripts = script_adherence(&t, &[2, 3], DayRange::new(1, 2));
        let percents: Vec<f64> = scripts.bars.iter().map(|b| b.percent).collect();
        assert_eq!(percents, vec![45.0, 75.0, 95.0]);
        let bands: Vec<AdherenceBand> = scripts.bars.iter().map(|b| b.band).collect();
        assert_eq!(bands, vec![AdherenceBand::Red, AdherenceBand::Orange, AdherenceBand::Green]);
    }

    #[test]
    fn sales_funnel_sums_sources_and_contracts() {
        let agg = aggregated(&[
            ("Зарема", 10.0),
            ("Мади", 5.0),
            ("ИНТЕРНЕТ ЗАЯВКИ - ИЗ", 5.0),
            ("Визиты", 8.0),
            ("Тест-драйвы", 4.0),
            ("Контракт наличные", 1.0),
            ("Контракт кредит", 1.0),
            ("Выдачи", 1.0),
        ]);
        let funnel = sales_funnel(&agg, DayRange::new(1, 3)).unwrap();
        let values: Vec<f64> = funnel.stages.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![20.0, 8.0, 4.0, 0.0, 2.0, 1.0]);
        assert_eq!(funnel.stages[0].percent_of_previous, None);
        assert_eq!(funnel.stages[1].percent_of_previous, Some(40.0));
        assert_eq!(funnel.stages[4].percent_of_previous, None);
        assert_eq!(funnel.stages[5].percent_of_previous, Some(50.0));

        assert!(sales_funnel(&AggregatedTable::default(), DayRange::new(1, 3)).is_none());
    }

    fn reasons_table(count: usize) -> IndicatorTable {
        let labels: Vec<String> = (1..=count).map(|i| format!("Причина номер {}", i)).collect();
        let mut rows = vec![
            ("Входящие звонки - ВЗ", numbers(&[100.0])),
            ("ОТКАЗЫ", vec![]),
        ];
        for (i, label) in labels.iter().enumerate() {
            rows.push((label.as_str(), numbers(&[(i + 1) as f64])));
        }
        rows.push(("ИТОГО ПО ОТДЕЛУ", numbers(&[500.0])));
        rows.push(("Причина после секции", numbers(&[50.0])));
        table(&rows)
    }

    #[test]
    fn rejection_reasons_keep_top_ten_ascending() {
        let t = reasons_table(12);
        let agg = aggregate(&t, &[2]);
        let reasons = rejection_reasons(&t, &agg, DayRange::new(1, 1)).unwrap();
        assert_eq!(reasons.reasons.len(), 10);
        let values: Vec<f64> = reasons.reasons.iter().map(|r| r.value).collect();
        assert_eq!(values, (3..=12).map(|v| v as f64).collect::<Vec<_>>());
        assert_eq!(reasons.reasons[9].label, "Причина номер 12");
    }

    #[test]
    fn rejection_scan_skips_uppercase_rows_with_keywords() {
        let t = table(&[
            ("ОТКАЗЫ", vec![]),
            ("НЕ ДОЗВОНИЛИСЬ", numbers(&[2.0])),
            ("", vec![]),
            ("Купил в другом месте", numbers(&[3.0])),
            ("Нет ответа", numbers(&[0.0])),
            ("ПРОДАЖИ", numbers(&[9.0])),
            ("Дорого", numbers(&[4.0])),
        ]);
        let agg = aggregate(&t, &[2]);
        let reasons = rejection_reasons(&t, &agg, DayRange::new(1, 1)).unwrap();
        let labels: Vec<&str> = reasons.reasons.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["НЕ ДОЗВОНИЛИСЬ", "Купил в другом месте"]);
    }

    #[test]
    fn rejection_scan_falls_back_to_fixed_row() {
        let mut rows: Vec<(String, Vec<Cell>)> = (0..37)
            .map(|i| (format!("Показатель {}", i), numbers(&[1.0])))
            .collect();
        rows.push(("Дорого".to_string(), numbers(&[6.0])));
        let refs: Vec<(&str, Vec<Cell>)> = rows.iter().map(|(l, c)| (l.as_str(), c.clone())).collect();
        let t = table(&refs);
        let agg = aggregate(&t, &[2]);
        let reasons = rejection_reasons(&t, &agg, DayRange::new(1, 1)).unwrap();
        assert_eq!(reasons.reasons.len(), 1);
        assert_eq!(reasons.reasons[0].value, 6.0);

        let short = table(&[("Визиты", numbers(&[1.0]))]);
        assert!(rejection_reasons(&short, &aggregate(&short, &[2]), DayRange::new(1, 1)).is_none());
    }

    #[test]
    fn section_boundary_rules() {
        assert!(is_section_boundary("ПРОДАЖИ"));
        assert!(!is_section_boundary("ЗВО"));
        assert!(!is_section_boundary("ОШИБОЧНО"));
        assert!(!is_section_boundary("Продажи"));
        assert!(!is_section_boundary("ИЗ"));
    }
}

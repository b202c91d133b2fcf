const MONTHS: [&str; 12] = [
    "Январь", "Февраль", "Март", "Апрель", "Май", "Июнь", "Июль",
    "Август", "Сентябрь", "Октябрь", "Ноябрь", "Декабрь",
];

/// Name of the sheet one month earlier, found by swapping the first month
/// name (calendar order) that appears in `sheet_name`.
pub fn previous_sheet_name(sheet_name: &str) -> Option<String> {
    MONTHS.iter().enumerate().find_map(|(i, month)| {
        if sheet_name.contains(month) {
            let prev_month = MONTHS[(i + MONTHS.len() - 1) % MONTHS.len()];
            Some(sheet_name.replace(month, prev_month))
        } else {
            None
        }
    })
}

/// Previous-period sheet, only if the workbook actually has it.
pub fn previous_sheet<'a>(sheet_name: &str, available: &'a [String]) -> Option<&'a String> {
    let candidate = previous_sheet_name(sheet_name)?;
    let found = available.iter().find(|name| **name == candidate);
    if found.is_none() {
        tracing::debug!("Previous sheet {} not present in workbook", candidate);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swaps_month_for_the_previous_one() {
        assert_eq!(previous_sheet_name("Отчет Март 2024").as_deref(), Some("Отчет Февраль 2024"));
        assert_eq!(previous_sheet_name("Отчет Декабрь").as_deref(), Some("Отчет Ноябрь"));
    }

    #[test]
    fn january_wraps_to_december() {
        assert_eq!(previous_sheet_name("Отчет Январь 2025").as_deref(), Some("Отчет Декабрь 2025"));
    }

    #[test]
    fn no_month_means_no_previous_sheet() {
        assert_eq!(previous_sheet_name("Отчет итоговый"), None);
    }

    #[test]
    fn previous_sheet_must_exist() {
        let sheets = vec!["Отчет Март".to_string(), "Отчет Февраль".to_string()];
        assert_eq!(previous_sheet("Отчет Март", &sheets).map(String::as_str), Some("Отчет Февраль"));
        assert_eq!(previous_sheet("Отчет Февраль", &sheets), None);
    }
}

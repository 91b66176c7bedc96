/// Short audit text for a scored course, checked in priority order.
pub(crate) fn explain(fit: f64, interest: f64, progress: f64, subdomain: &str) -> String {
    if progress > 0.7 {
        "Advances your graduation requirements".to_string()
    } else if interest > 0.7 {
        "Matches your demonstrated interests".to_string()
    } else if fit > 0.8 {
        "Excellent overall fit for your profile".to_string()
    } else {
        format!("Advances your progress in {subdomain}")
    }
}

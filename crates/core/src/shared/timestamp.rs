use crate::shared::constants::TIMESTAMP_FORMAT;

/// Current local time as `YYYY-MM-DD HH:MM:SS`.
pub fn local_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_now_shape() {
        let now = local_now();
        assert_eq!(now.len(), 19);
        assert!(chrono::NaiveDateTime::parse_from_str(&now, TIMESTAMP_FORMAT).is_ok());
    }
}

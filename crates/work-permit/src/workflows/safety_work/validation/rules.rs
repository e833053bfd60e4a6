use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static MOBILE_PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^1[3-9][0-9]{9}$").expect("mobile phone pattern compiles"));

static NATIONAL_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{6}((?:18|19|20)[0-9]{2})(0[1-9]|1[0-2])([0-9]{2})[0-9]{3}[0-9Xx]$")
        .expect("national id pattern compiles")
});

static EMPLOYEE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{12}$").expect("employee number pattern compiles"));

/// Eleven digits, second digit 3-9.
pub(crate) fn is_mobile_phone(value: &str) -> bool {
    MOBILE_PHONE.is_match(value)
}

/// 18-character resident ID: region, a real birth date in 18xx-20xx, sequence, check char.
pub(crate) fn is_national_id(value: &str) -> bool {
    let Some(captures) = NATIONAL_ID.captures(value) else {
        return false;
    };

    let field = |index: usize| {
        captures
            .get(index)
            .and_then(|m| m.as_str().parse::<u32>().ok())
    };

    match (field(1), field(2), field(3)) {
        (Some(year), Some(month), Some(day)) => {
            NaiveDate::from_ymd_opt(year as i32, month, day).is_some()
        }
        _ => false,
    }
}

pub(crate) fn is_employee_number(value: &str) -> bool {
    EMPLOYEE_NUMBER.is_match(value)
}

/// Check a basis number against the selected basis code, returning the message on failure.
pub(crate) fn check_basis_number(basis: &str, number: &str) -> Result<(), &'static str> {
    let lowered = number.to_lowercase();
    match basis {
        "ncr" if !lowered.contains("ncr") => Err("NCR basis number must contain \"NCR\""),
        "design_change" if !lowered.contains("cm") => {
            Err("design change basis number must contain \"CM\"")
        }
        "ncr" | "design_change" | "nonconformity" => Ok(()),
        _ if number.chars().count() < 6 => Err("basis number must be at least 6 characters"),
        _ => Ok(()),
    }
}

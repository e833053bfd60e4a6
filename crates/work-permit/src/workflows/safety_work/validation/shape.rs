//! Field-by-field decoding of a posted form.
//!
//! A field holding the wrong JSON type is left empty on the candidate and reported under its
//! own key, so the remaining rules still run over everything that did decode.
use serde_json::{Map, Value};

use super::FieldErrors;
use crate::workflows::safety_work::domain::{AccompanyingPersonInput, SubmissionCandidate};

const EXPECTED_TEXT: &str = "must be text";
const EXPECTED_COUNT: &str = "must be a non-negative whole number";
const EXPECTED_CODES: &str = "must be a list of option codes";

/// Decode a JSON body into a candidate plus the type errors found along the way.
pub fn decode_form(value: Value) -> (SubmissionCandidate, FieldErrors) {
    let mut errors = FieldErrors::new();

    let Value::Object(mut fields) = value else {
        errors.insert("form", "form must be a JSON object");
        return (SubmissionCandidate::default(), errors);
    };

    let mut form = Fields {
        fields: &mut fields,
        prefix: String::new(),
        errors: &mut errors,
    };

    let candidate = SubmissionCandidate {
        name: form.text("name"),
        id_number: form.text("idNumber"),
        phone_number: form.text("phoneNumber"),
        employee_number: form.text("employeeNumber"),
        department: form.text("department"),
        company_name: form.text("companyName"),
        project_name: form.text("projectName"),
        work_location: form.text("workLocation"),
        work_type: form.text("workType"),
        work_content: form.text("workContent"),
        start_date: form.text("startDate"),
        start_time: form.text("startTime"),
        working_hours: form.text("workingHours"),
        vehicle_number: form.text("vehicleNumber"),
        track_position: form.text("trackPosition"),
        product_quantity: form.count("productQuantity"),
        work_basis: form.text("workBasis"),
        basis_number: form.text("basisNumber"),
        danger_types: form.codes("dangerTypes"),
        notifier_name: form.text("notifierName"),
        notifier_number: form.text("notifierNumber"),
        notifier_department: form.text("notifierDepartment"),
        accompanying_count: form.count("accompanyingCount"),
        accompanying_persons: form.persons("accompanyingPersons"),
    };

    (candidate, errors)
}

struct Fields<'a> {
    fields: &'a mut Map<String, Value>,
    prefix: String,
    errors: &'a mut FieldErrors,
}

impl Fields<'_> {
    fn take(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key).filter(|value| !value.is_null())
    }

    fn reject(&mut self, key: &str, message: &str) {
        self.errors.insert(format!("{}{key}", self.prefix), message);
    }

    fn text(&mut self, key: &str) -> Option<String> {
        match self.take(key)? {
            Value::String(text) => Some(text),
            _ => {
                self.reject(key, EXPECTED_TEXT);
                None
            }
        }
    }

    fn count(&mut self, key: &str) -> Option<u32> {
        let value = self.take(key)?;
        let count = value.as_u64().and_then(|count| u32::try_from(count).ok());
        if count.is_none() {
            self.reject(key, EXPECTED_COUNT);
        }
        count
    }

    fn codes(&mut self, key: &str) -> Option<Vec<String>> {
        let codes = match self.take(key)? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(code) => Some(code),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>(),
            _ => None,
        };
        if codes.is_none() {
            self.reject(key, EXPECTED_CODES);
        }
        codes
    }

    fn persons(&mut self, key: &str) -> Option<Vec<AccompanyingPersonInput>> {
        let Value::Array(rows) = self.take(key)? else {
            self.reject(key, "must be a list of persons");
            return None;
        };

        let persons = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| {
                let Value::Object(mut fields) = row else {
                    self.reject(&format!("{key}[{index}]"), "must be an object");
                    return AccompanyingPersonInput::default();
                };

                let mut person = Fields {
                    fields: &mut fields,
                    prefix: format!("{}{key}[{index}].", self.prefix),
                    errors: &mut *self.errors,
                };

                AccompanyingPersonInput {
                    name: person.text("name"),
                    id_number: person.text("idNumber"),
                    phone_number: person.text("phoneNumber"),
                    employee_number: person.text("employeeNumber"),
                    department: person.text("department"),
                }
            })
            .collect();

        Some(persons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn well_typed_form_decodes_like_serde() {
        let body = json!({
            "name": "张三",
            "productQuantity": 3,
            "dangerTypes": ["hot_work"],
            "accompanyingCount": 1,
            "accompanyingPersons": [{ "name": "王五", "phoneNumber": "13912345678" }],
            "unknownField": true
        });
        let expected: SubmissionCandidate =
            serde_json::from_value(body.clone()).expect("serde decodes");

        let (candidate, errors) = decode_form(body);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(candidate, expected);
    }

    #[test]
    fn wrong_types_are_reported_per_field() {
        let (candidate, errors) = decode_form(json!({
            "name": 123,
            "companyName": "示例公司A",
            "productQuantity": -1,
            "accompanyingCount": "2",
            "dangerTypes": "high_altitude",
            "accompanyingPersons": [{ "name": "王五", "idNumber": 110101 }, "赵六"]
        }));

        assert_eq!(errors.get("name"), Some(EXPECTED_TEXT));
        assert_eq!(errors.get("productQuantity"), Some(EXPECTED_COUNT));
        assert_eq!(errors.get("accompanyingCount"), Some(EXPECTED_COUNT));
        assert_eq!(errors.get("dangerTypes"), Some(EXPECTED_CODES));
        assert_eq!(
            errors.get("accompanyingPersons[0].idNumber"),
            Some(EXPECTED_TEXT)
        );
        assert!(errors.contains("accompanyingPersons[1]"));

        assert_eq!(candidate.name, None);
        assert_eq!(candidate.company_name.as_deref(), Some("示例公司A"));
        assert_eq!(candidate.persons().len(), 2);
        assert_eq!(candidate.persons()[0].name.as_deref(), Some("王五"));
    }

    #[test]
    fn non_object_body_is_a_form_error() {
        let (candidate, errors) = decode_form(json!(["not", "a", "form"]));
        assert!(errors.contains("form"));
        assert_eq!(candidate, SubmissionCandidate::default());
    }
}

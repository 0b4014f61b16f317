use draftline_lib::Record;
use serde_json::{json, Value};

pub fn as_record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture must be a JSON object, got {other}"),
    }
}

pub fn create_test_employee(id: &str) -> Record {
    as_record(json!({
        "id": id,
        "firstName": "Aiko",
        "lastName": "Tanaka",
        "email": "aiko.tanaka@example.com",
        "departmentId": 3,
        "monthlySalary": 5200,
        "isActive": true,
        "hiredAt": "2021-04-01T00:00:00Z",
        "skills": ["payroll", "excel"],
        "address": {"city": "Osaka", "postalCode": "530-0001"},
        "managerId": null,
        "updatedAt": "2024-01-10T08:00:00Z"
    }))
}

pub fn create_test_absence(id: &str, employee_id: &str) -> Value {
    json!({
        "id": id,
        "employeeId": employee_id,
        "type": "vacation",
        "startDate": "2024-08-12T00:00:00Z",
        "endDate": "2024-08-16T00:00:00Z",
        "comment": ""
    })
}

//! Record-to-plan path through the public API, no browser involved.

use std::fs;

use iol_autofill::prepare_plan;

#[test]
fn exported_record_resolves_to_a_full_plan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exported_iol_data.json");
    fs::write(
        &path,
        r#"{
            "gender": "Male",
            "surgeon": "Dr. Who",
            "patientInitials": "AB",
            "patientId": "P-77",
            "age": 63,
            "iolData": {
                "rightEye": {
                    "AL": "23.64",
                    "ACD": "3.12 mm",
                    "LT": "4.70",
                    "CCT": "545",
                    "WTW": "11.9 / 12.1",
                    "K1": "45.17 / 7.47 @ 178",
                    "K2": "44.82 / 7.53 @ 88"
                },
                "leftEye": { "AL": "23.70" }
            }
        }"#,
    )
    .unwrap();

    let plan = prepare_plan(&path).unwrap();

    assert_eq!(plan.gender, "Male");
    assert_eq!(plan.identity.get("Surgeon"), Some("Dr. Who"));
    assert_eq!(plan.identity.get("Patient Initials"), Some("AB"));
    assert_eq!(plan.identity.get("Id"), Some("P-77"));
    assert_eq!(plan.identity.get("Age"), Some("63"));
    // The export's rightEye block feeds the form's Left Eye column.
    assert_eq!(plan.biometry.get("AL"), Some("23.64"));
    assert_eq!(plan.biometry.get("ACD"), Some("3.12"));
    assert_eq!(plan.biometry.get("LT"), Some("4.70"));
    assert_eq!(plan.biometry.get("CCT"), Some("545"));
    assert_eq!(plan.biometry.get("CD (WTW)"), Some("11.9"));
    assert_eq!(plan.biometry.get("K1"), Some("45.17"));
    assert_eq!(plan.biometry.get("K2"), Some("44.82"));
}

#[test]
fn malformed_record_is_rejected_up_front() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exported_iol_data.json");
    fs::write(&path, "{ not json").unwrap();

    assert!(prepare_plan(&path).is_err());
}

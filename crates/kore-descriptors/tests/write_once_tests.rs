use super::*;

#[test]
fn test_write_once_accepts_first_value() {
    let cell = WriteOnce::new("overridden descriptors");
    assert!(!cell.is_set());
    cell.set(vec![1, 2], || "foo".to_string()).unwrap();
    assert_eq!(cell.get(), Some(&vec![1, 2]));
}

#[test]
fn test_write_once_rejects_second_value() {
    let cell = WriteOnce::new("visibility");
    cell.set(1u8, || "bar".to_string()).unwrap();
    let error = cell.set(2u8, || "bar".to_string()).unwrap_err();
    assert_eq!(
        error,
        DescriptorError::IllegalStateMutation {
            field: "visibility",
            descriptor: "bar".to_string()
        }
    );
    assert_eq!(cell.get(), Some(&1));
    assert_eq!(error.to_string(), "visibility of bar is already set");
}

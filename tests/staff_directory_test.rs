//! Integration tests for the staff directory
//!
//! Exercises create-or-merge role semantics, the jshshir uniqueness guard
//! on update, and credential verification.

use dmed::core::UserService;
use dmed::domain::{DmedError, Gender, Jshshir, NewUser, Role, UserUpdate};
use dmed::store::MemoryStore;
use std::collections::BTreeSet;
use std::sync::Arc;

fn setup() -> UserService {
    UserService::new(Arc::new(MemoryStore::new()))
}

fn user_fields(jshshir: &str, roles: &[Role]) -> NewUser {
    NewUser {
        full_name: "Dilshod Rakhimov".to_string(),
        jshshir: Jshshir::new(jshshir).unwrap(),
        roles: roles.iter().copied().collect(),
        gender: Gender::Male,
        birth_date: chrono::NaiveDate::from_ymd_opt(1985, 3, 2).unwrap(),
        phone: Some("+998971234567".to_string()),
    }
}

#[tokio::test]
async fn test_repeated_create_accumulates_roles_in_one_row() {
    let users = setup();

    let first = users
        .create_or_merge(user_fields("12345678901234", &[Role::Doctor, Role::Nurse]))
        .await
        .unwrap();
    let second = users
        .create_or_merge(user_fields("12345678901234", &[Role::Nurse, Role::Manager]))
        .await
        .unwrap();

    let expected: BTreeSet<Role> = [Role::Doctor, Role::Nurse, Role::Manager]
        .into_iter()
        .collect();
    assert_eq!(second.id, first.id);
    assert_eq!(second.roles, expected);
    assert_eq!(second.password, first.password, "merge must not regenerate the password");
    assert_eq!(users.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_different_jshshir_creates_separate_rows() {
    let users = setup();
    users
        .create_or_merge(user_fields("12345678901234", &[Role::Doctor]))
        .await
        .unwrap();
    users
        .create_or_merge(user_fields("98765432109876", &[Role::Receptionist]))
        .await
        .unwrap();
    assert_eq!(users.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_generated_password_is_six_digits() {
    let users = setup();
    let user = users
        .create_or_merge(user_fields("12345678901234", &[Role::PatronageNurse]))
        .await
        .unwrap();
    assert_eq!(user.password.len(), 6);
    assert!(user.password.bytes().all(|b| b.is_ascii_digit()));
}

#[tokio::test]
async fn test_update_jshshir_to_taken_value_fails_atomically() {
    let users = setup();
    let a = users
        .create_or_merge(user_fields("12345678901234", &[Role::Doctor]))
        .await
        .unwrap();
    let b = users
        .create_or_merge(user_fields("98765432109876", &[Role::Nurse]))
        .await
        .unwrap();

    let err = users
        .update(
            b.id,
            UserUpdate {
                jshshir: Some(a.jshshir.clone()),
                full_name: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DmedError::AlreadyExists { resource: "User", field: "jshshir", .. }
    ));

    // Neither row changed.
    let a_after = users.get(a.id).await.unwrap();
    let b_after = users.get(b.id).await.unwrap();
    assert_eq!(a_after.jshshir, a.jshshir);
    assert_eq!(b_after.jshshir, b.jshshir);
    assert_eq!(b_after.full_name, "Dilshod Rakhimov");
}

#[tokio::test]
async fn test_update_roles_replaces_instead_of_merging() {
    let users = setup();
    let user = users
        .create_or_merge(user_fields("12345678901234", &[Role::Doctor, Role::Nurse]))
        .await
        .unwrap();

    let updated = users
        .update(
            user.id,
            UserUpdate {
                roles: Some([Role::Manager].into_iter().collect()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let expected: BTreeSet<Role> = [Role::Manager].into_iter().collect();
    assert_eq!(updated.roles, expected);
}

#[tokio::test]
async fn test_get_and_delete_report_not_found() {
    let users = setup();
    assert!(matches!(
        users.get(7).await.unwrap_err(),
        DmedError::NotFound { resource: "User", id: 7 }
    ));
    assert!(matches!(
        users.delete(7).await.unwrap_err(),
        DmedError::NotFound { resource: "User", id: 7 }
    ));
}

#[tokio::test]
async fn test_authenticate_round_trip() {
    let users = setup();
    let user = users
        .create_or_merge(user_fields("12345678901234", &[Role::Doctor]))
        .await
        .unwrap();

    // The generated password works...
    let authenticated = users
        .authenticate(&user.jshshir, &user.password)
        .await
        .unwrap();
    assert_eq!(authenticated.id, user.id);

    // ...a wrong one and an unknown jshshir fail identically.
    let wrong = users.authenticate(&user.jshshir, "999999").await.unwrap_err();
    let unknown = users
        .authenticate(&Jshshir::new("11111111111111").unwrap(), "999999")
        .await
        .unwrap_err();
    assert!(matches!(wrong, DmedError::InvalidCredentials));
    assert!(matches!(unknown, DmedError::InvalidCredentials));
}

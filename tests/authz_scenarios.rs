use anyhow::Result;
use crewgate::authz::{
    AuthFailure, Authenticator, CredentialStore, DataSensitivity, LoginThrottle, MemoryStore,
    Module, PermissionLevel, PrincipalRecord, Role, SessionBuilder, SessionError, SessionRequest,
    can_access_data, check_permission, effective_level, password::hash_password,
    rate_limit::InMemoryRateLimiter,
};
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

const PASSWORD: &str = "s3cret-pass";

fn seeded(role: &str) -> Result<(Arc<MemoryStore>, Uuid)> {
    let store = Arc::new(MemoryStore::new());
    let id = Uuid::new_v4();
    store.insert_principal(PrincipalRecord {
        id,
        email: "user@example.com".to_string(),
        name: "User".to_string(),
        password_hash: Some(hash_password(PASSWORD)?),
        roles: vec![role.to_string()],
        is_system_admin: false,
    });
    Ok((store, id))
}

fn authenticator(store: Arc<MemoryStore>) -> Authenticator {
    let store: Arc<dyn CredentialStore> = store;
    Authenticator::new(store, Arc::new(InMemoryRateLimiter::new()))
        .with_throttle(LoginThrottle::new(3, Duration::from_secs(60)))
}

#[tokio::test]
async fn role_change_rebuilds_overrides() -> Result<()> {
    let (store, id) = seeded("ACCOUNTING")?;
    let sessions = SessionBuilder::new(store.clone());

    let principal = authenticator(store.clone())
        .authenticate("user@example.com", PASSWORD)
        .await?;
    let state = sessions.build(SessionRequest::SignIn(&principal)).await?;
    assert!(check_permission(
        Some(&state),
        Module::Documents,
        PermissionLevel::ViewAccess
    ));
    assert!(!check_permission(
        Some(&state),
        Module::Documents,
        PermissionLevel::EditAccess
    ));

    store.upsert_override(Role::Hr, Module::Documents, PermissionLevel::FullAccess);
    store.set_roles(id, &["HR"]);

    let refreshed = sessions.build(SessionRequest::Refresh(&state)).await?;
    assert_eq!(refreshed.primary_role(), Role::Hr);
    assert!(refreshed.overrides().is_loaded_for(&[Role::Hr]));
    assert_eq!(
        effective_level(Some(&refreshed), Module::Documents),
        PermissionLevel::FullAccess
    );
    Ok(())
}

#[tokio::test]
async fn new_override_applies_after_session_rebuild() -> Result<()> {
    let (store, _) = seeded("ACCOUNTING")?;
    let sessions = SessionBuilder::new(store.clone());

    let principal = authenticator(store.clone())
        .authenticate("user@example.com", PASSWORD)
        .await?;
    let state = sessions.build(SessionRequest::SignIn(&principal)).await?;
    assert!(!check_permission(
        Some(&state),
        Module::Documents,
        PermissionLevel::EditAccess
    ));

    store.upsert_override(Role::Accounting, Module::Documents, PermissionLevel::EditAccess);
    let rebuilt = sessions.build(SessionRequest::Refresh(&state)).await?;
    assert!(check_permission(
        Some(&rebuilt),
        Module::Documents,
        PermissionLevel::EditAccess
    ));
    assert!(!check_permission(
        Some(&rebuilt),
        Module::Documents,
        PermissionLevel::FullAccess
    ));
    Ok(())
}

#[tokio::test]
async fn demotion_leaves_no_privilege_behind() -> Result<()> {
    let (store, id) = seeded("HR")?;
    store.upsert_override(Role::Hr, Module::Accounting, PermissionLevel::EditAccess);
    let sessions = SessionBuilder::new(store.clone());

    let principal = authenticator(store.clone())
        .authenticate("user@example.com", PASSWORD)
        .await?;
    let state = sessions.build(SessionRequest::SignIn(&principal)).await?;
    assert_eq!(
        effective_level(Some(&state), Module::Accounting),
        PermissionLevel::EditAccess
    );

    store.set_roles(id, &["CREW_PORTAL"]);
    let demoted = sessions.build(SessionRequest::Refresh(&state)).await?;
    assert_eq!(demoted.roles(), &[Role::CrewPortal]);
    assert!(demoted.overrides().get(Role::Hr, Module::Accounting).is_none());
    for module in Module::ALL {
        assert!(effective_level(Some(&demoted), module) <= PermissionLevel::ViewAccess);
    }
    assert!(!can_access_data(
        Some(&demoted),
        Module::Accounting,
        DataSensitivity::Amber,
        PermissionLevel::ViewAccess
    ));
    Ok(())
}

#[tokio::test]
async fn storage_failure_is_distinct_from_bad_credentials() -> Result<()> {
    let (store, _) = seeded("STAFF")?;
    let auth = authenticator(store.clone());

    store.set_available(false);
    let outage = auth.authenticate("user@example.com", PASSWORD).await;
    assert!(matches!(outage, Err(AuthFailure::StorageUnavailable)));

    store.set_available(true);
    let wrong = auth.authenticate("user@example.com", "nope").await;
    assert!(matches!(wrong, Err(AuthFailure::InvalidCredentials)));
    Ok(())
}

#[tokio::test]
async fn refresh_during_outage_keeps_error_distinct() -> Result<()> {
    let (store, id) = seeded("OPERATIONAL")?;
    let sessions = SessionBuilder::new(store.clone());
    let principal = authenticator(store.clone())
        .authenticate("user@example.com", PASSWORD)
        .await?;
    let state = sessions.build(SessionRequest::SignIn(&principal)).await?;
    assert_eq!(state.principal_id(), id);

    store.set_available(false);
    let result = sessions.build(SessionRequest::Refresh(&state)).await;
    assert!(matches!(result, Err(SessionError::StorageUnavailable)));
    Ok(())
}

#[tokio::test]
async fn unknown_stored_role_falls_back_to_crew_portal() -> Result<()> {
    let (store, _) = seeded("JANITOR")?;
    let sessions = SessionBuilder::new(store.clone());
    let principal = authenticator(store.clone())
        .authenticate("user@example.com", PASSWORD)
        .await?;
    let state = sessions.build(SessionRequest::SignIn(&principal)).await?;
    assert_eq!(state.roles(), &[Role::CrewPortal]);
    for module in Module::ALL {
        assert!(effective_level(Some(&state), module) <= PermissionLevel::ViewAccess);
    }
    assert_eq!(
        effective_level(Some(&state), Module::Admin),
        PermissionLevel::NoAccess
    );
    Ok(())
}

use std::sync::Arc;

use uuid::Uuid;

use crate::database::Repo;
use crate::error::{Error, Result};
use crate::models::user::{Actor, Assessee, Assessor, Principal};

/// Maps an authenticated email to the role it plays in this service.
#[derive(Clone)]
pub struct IdentityService {
    repo: Arc<dyn Repo>,
}

impl IdentityService {
    pub fn new(repo: Arc<dyn Repo>) -> Self {
        Self { repo }
    }

    pub async fn resolve_company_or_assessor(&self, email: &str) -> Result<Actor> {
        if let Some(company) = self.repo.company_try_load_by_email(email).await? {
            return Ok(Actor::Company(company));
        }
        if let Some(assessor) = self.repo.assessor_try_load_by_email(email).await? {
            return Ok(Actor::Assessor(assessor));
        }
        Err(Error::Unauthorized(format!(
            "{} is not registered as a company or an assessor",
            email
        )))
    }

    pub async fn resolve_assessor(&self, email: &str) -> Result<Assessor> {
        self.repo
            .assessor_try_load_by_email(email)
            .await?
            .ok_or_else(|| Error::Unauthorized(format!("{} is not registered as an assessor", email)))
    }

    pub async fn resolve_assessee(&self, email: &str) -> Result<Assessee> {
        self.repo
            .assessee_try_load_by_email(email)
            .await?
            .ok_or_else(|| Error::Unauthorized(format!("{} is not registered as an assessee", email)))
    }

    /// Companies and assessors first, then assessees.
    pub async fn resolve_principal(&self, email: &str) -> Result<Principal> {
        match self.resolve_company_or_assessor(email).await {
            Ok(actor) => Ok(actor.into()),
            Err(Error::Unauthorized(_)) => match self.repo.assessee_try_load_by_email(email).await? {
                Some(assessee) => Ok(Principal::Assessee(assessee)),
                None => Err(Error::Unauthorized(format!("{} is not a registered user", email))),
            },
            Err(e) => Err(e),
        }
    }

    /// Lookup by someone else's email, so absence is a NotFound.
    pub async fn find_assessee(&self, email: &str) -> Result<Assessee> {
        self.repo
            .assessee_try_load_by_email(email)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Assessee with email {} does not exist", email)))
    }

    pub async fn resolve_assessor_of_company(&self, email: &str, company_id: Uuid) -> Result<Assessor> {
        match self.repo.assessor_try_load_by_email(email).await? {
            Some(assessor) if assessor.company_id == company_id => Ok(assessor),
            _ => Err(Error::NotFound(format!(
                "Assessor with email {} does not exist in the company",
                email
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryRepo;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn company_wins_over_assessor_lookup() {
        let repo = MemoryRepo::new();
        let company = repo.add_company("Acme", "hr@acme.test");
        let assessor = repo.add_assessor(company.id, "ann@acme.test", "Ann", "Lee");
        let svc = IdentityService::new(Arc::new(repo));

        let actor = svc.resolve_company_or_assessor("hr@acme.test").await.unwrap();
        assert_eq!(actor, Actor::Company(company.clone()));

        let actor = svc.resolve_company_or_assessor("ann@acme.test").await.unwrap();
        assert_eq!(actor.company_id(), company.id);
        assert_eq!(actor.assessor(), Some(&assessor));
    }

    #[tokio::test]
    async fn unknown_principal_is_unauthorized() {
        let svc = IdentityService::new(Arc::new(MemoryRepo::new()));
        let err = svc.resolve_company_or_assessor("ghost@x.test").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn assessor_of_another_company_is_not_found() {
        let repo = MemoryRepo::new();
        let acme = repo.add_company("Acme", "hr@acme.test");
        let other = repo.add_company("Other", "hr@other.test");
        repo.add_assessor(other.id, "bob@other.test", "Bob", "Ray");
        let svc = IdentityService::new(Arc::new(repo));

        let err = svc
            .resolve_assessor_of_company("bob@other.test", acme.id)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(svc.resolve_assessor_of_company("bob@other.test", other.id).await.is_ok());
    }

    #[tokio::test]
    async fn principal_falls_back_to_assessee() {
        let repo = MemoryRepo::new();
        let company = repo.add_company("Acme", "hr@acme.test");
        let sam = repo.add_assessee("sam@mail.test", "Sam", "Doe");
        let svc = IdentityService::new(Arc::new(repo));

        assert_eq!(
            svc.resolve_principal("hr@acme.test").await.unwrap(),
            Principal::Company(company)
        );
        assert_eq!(
            svc.resolve_principal("sam@mail.test").await.unwrap(),
            Principal::Assessee(sam)
        );
        let err = svc.resolve_principal("ghost@x.test").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}

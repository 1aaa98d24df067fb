use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Assessor {
    pub id: Uuid,
    pub company_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Assessee {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Principal allowed to manage a company's flows and events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Company(Company),
    Assessor(Assessor),
}

impl Actor {
    pub fn company_id(&self) -> Uuid {
        match self {
            Actor::Company(c) => c.id,
            Actor::Assessor(a) => a.company_id,
        }
    }

    pub fn assessor(&self) -> Option<&Assessor> {
        match self {
            Actor::Assessor(a) => Some(a),
            Actor::Company(_) => None,
        }
    }
}

/// Any authenticated caller, resolved from the token subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Company(Company),
    Assessor(Assessor),
    Assessee(Assessee),
}

impl Principal {
    pub fn id(&self) -> Uuid {
        match self {
            Principal::Company(c) => c.id,
            Principal::Assessor(a) => a.id,
            Principal::Assessee(a) => a.id,
        }
    }
}

impl From<Actor> for Principal {
    fn from(actor: Actor) -> Self {
        match actor {
            Actor::Company(c) => Principal::Company(c),
            Actor::Assessor(a) => Principal::Assessor(a),
        }
    }
}

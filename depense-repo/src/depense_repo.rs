use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

#[async_trait]
pub trait DepenseRepo: Sync + Send {
    async fn get_depense(&self, depense_id: i32) -> Result<Depense, DepenseRepoError>;

    /// Newest first: descending `created_at`, then descending `id`.
    async fn get_all_depenses(&self) -> Result<Vec<Depense>, DepenseRepoError>;

    async fn create_depense(&self, new_depense: NewDepense) -> Result<Depense, DepenseRepoError>;

    /// Applies only the fields set in `changes`, within a single transaction.
    /// `updated_at` always advances.
    async fn update_depense(
        &self,
        depense_id: i32,
        changes: DepenseChanges,
    ) -> Result<UpdatedDepense, DepenseRepoError>;

    async fn delete_depense(&self, depense_id: i32) -> Result<Depense, DepenseRepoError>;
}

#[derive(Error, Debug)]
pub enum DepenseRepoError {
    #[error("Depense with id {0} not found")]
    DepenseNotFound(i32),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Error, Debug, PartialEq)]
#[error("\"{0}\" is not a valid choice.")]
pub struct InvalidChoice(pub String);

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Salaire,
    Eau,
    Electricite,
    Loyer,
    Transport,
    Approvisionnement,
    Autre,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Salaire,
        Category::Eau,
        Category::Electricite,
        Category::Loyer,
        Category::Transport,
        Category::Approvisionnement,
        Category::Autre,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Category::Salaire => "SALAIRE",
            Category::Eau => "EAU",
            Category::Electricite => "ELECTRICITE",
            Category::Loyer => "LOYER",
            Category::Transport => "TRANSPORT",
            Category::Approvisionnement => "APPROVISIONNEMENT",
            Category::Autre => "AUTRE",
        }
    }
}

impl FromStr for Category {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| InvalidChoice(s.to_owned()))
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Wave,
    OrangeMoney,
    FreeMoney,
    Cash,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Wave,
        PaymentMethod::OrangeMoney,
        PaymentMethod::FreeMoney,
        PaymentMethod::Cash,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Wave => "WAVE",
            PaymentMethod::OrangeMoney => "ORANGE_MONEY",
            PaymentMethod::FreeMoney => "FREE_MONEY",
            PaymentMethod::Cash => "CASH",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| InvalidChoice(s.to_owned()))
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored expense. `attachment` is a path relative to the attachment store root.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Depense {
    pub id: i32,
    pub title: String,
    pub amount: Decimal,
    pub category: Category,
    pub custom_category: Option<String>,
    pub payment_method: PaymentMethod,
    pub attachment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Display for Depense {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {} FCFA", self.title, self.amount)
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct NewDepense {
    pub title: String,
    pub amount: Decimal,
    pub category: Category,
    pub custom_category: Option<String>,
    pub payment_method: PaymentMethod,
    pub attachment: Option<String>,
}

impl NewDepense {
    pub const fn new(
        title: String,
        amount: Decimal,
        category: Category,
        custom_category: Option<String>,
        payment_method: PaymentMethod,
        attachment: Option<String>,
    ) -> NewDepense {
        NewDepense {
            title,
            amount,
            category,
            custom_category,
            payment_method,
            attachment,
        }
    }

    pub(crate) fn into_depense(self, id: i32, created_at: DateTime<Utc>) -> Depense {
        Depense {
            id,
            title: self.title,
            amount: self.amount,
            category: self.category,
            custom_category: self.custom_category,
            payment_method: self.payment_method,
            attachment: self.attachment,
            created_at,
            updated_at: created_at,
        }
    }
}

#[derive(Clone, PartialEq, Debug, Default)]
pub enum AttachmentChange {
    #[default]
    Keep,
    Remove,
    Replace(String),
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct DepenseChanges {
    pub title: Option<String>,
    pub amount: Option<Decimal>,
    pub category: Option<Category>,
    pub custom_category: Option<Option<String>>,
    pub payment_method: Option<PaymentMethod>,
    pub attachment: AttachmentChange,
}

impl DepenseChanges {
    pub(crate) fn apply(self, depense: &mut Depense) -> Option<String> {
        if let Some(title) = self.title {
            depense.title = title;
        }
        if let Some(amount) = self.amount {
            depense.amount = amount;
        }
        if let Some(category) = self.category {
            depense.category = category;
        }
        if let Some(custom_category) = self.custom_category {
            depense.custom_category = custom_category;
        }
        if let Some(payment_method) = self.payment_method {
            depense.payment_method = payment_method;
        }
        let previous = depense.attachment.clone();
        match self.attachment {
            AttachmentChange::Keep => {}
            AttachmentChange::Remove => depense.attachment = None,
            AttachmentChange::Replace(path) => depense.attachment = Some(path),
        }
        depense.updated_at = next_updated_at(depense.updated_at);

        previous.filter(|p| depense.attachment.as_ref() != Some(p))
    }
}

/// Result of an update. `released_attachment` is the blob the record no longer
/// references; the caller removes it once the update is committed.
#[derive(Clone, PartialEq, Debug)]
pub struct UpdatedDepense {
    pub depense: Depense,
    pub released_attachment: Option<String>,
}

pub(crate) fn next_updated_at(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now_micros();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// Current time truncated to the precision PostgreSQL stores.
pub(crate) fn now_micros() -> DateTime<Utc> {
    use chrono::SubsecRound;
    Utc::now().trunc_subsecs(6)
}

use crate::depense_repo::DepenseRepoError::DepenseNotFound;
use crate::depense_repo::{
    AttachmentChange, Category, Depense, DepenseChanges, DepenseRepo, DepenseRepoError,
    NewDepense, PaymentMethod, UpdatedDepense,
};
use crate::sqlx_repo::SQLxRepo;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{query_as, Postgres, QueryBuilder};
use tracing::instrument;

#[derive(sqlx::FromRow)]
struct DepenseEntry {
    id: i32,
    title: String,
    amount: Decimal,
    category: String,
    custom_category: Option<String>,
    payment_method: String,
    piece_justificative: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DepenseEntry> for Depense {
    type Error = DepenseRepoError;

    fn try_from(value: DepenseEntry) -> Result<Self, Self::Error> {
        let category: Category = value
            .category
            .parse()
            .with_context(|| format!("Depense {} has an unknown category", value.id))?;
        let payment_method: PaymentMethod = value
            .payment_method
            .parse()
            .with_context(|| format!("Depense {} has an unknown payment method", value.id))?;
        Ok(Depense {
            id: value.id,
            title: value.title,
            amount: value.amount,
            category,
            custom_category: value.custom_category,
            payment_method,
            attachment: value.piece_justificative,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

fn push_changes(query_builder: &mut QueryBuilder<'_, Postgres>, changes: DepenseChanges) {
    let mut assignments = query_builder.separated(", ");
    if let Some(title) = changes.title {
        assignments.push("title = ").push_bind_unseparated(title);
    }
    if let Some(amount) = changes.amount {
        assignments.push("amount = ").push_bind_unseparated(amount);
    }
    if let Some(category) = changes.category {
        assignments
            .push("category = ")
            .push_bind_unseparated(category.as_str());
    }
    if let Some(custom_category) = changes.custom_category {
        assignments
            .push("custom_category = ")
            .push_bind_unseparated(custom_category);
    }
    if let Some(payment_method) = changes.payment_method {
        assignments
            .push("payment_method = ")
            .push_bind_unseparated(payment_method.as_str());
    }
    match changes.attachment {
        AttachmentChange::Keep => {}
        AttachmentChange::Remove => {
            assignments.push("piece_justificative = NULL");
        }
        AttachmentChange::Replace(path) => {
            assignments
                .push("piece_justificative = ")
                .push_bind_unseparated(path);
        }
    }
    assignments
        .push("updated_at = GREATEST(clock_timestamp(), updated_at + INTERVAL '1 microsecond')");
}

#[async_trait]
impl DepenseRepo for SQLxRepo {
    #[instrument(skip(self))]
    async fn get_depense(&self, depense_id: i32) -> Result<Depense, DepenseRepoError> {
        query_as::<_, DepenseEntry>("SELECT * FROM depenses WHERE id = $1")
            .bind(depense_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Unable to get depense {}", depense_id))?
            .ok_or(DepenseNotFound(depense_id))?
            .try_into()
    }

    #[instrument(skip(self))]
    async fn get_all_depenses(&self) -> Result<Vec<Depense>, DepenseRepoError> {
        query_as::<_, DepenseEntry>("SELECT * FROM depenses ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await
            .context("Unable to get depenses")?
            .into_iter()
            .map(Depense::try_from)
            .collect()
    }

    #[instrument(skip(self, new_depense))]
    async fn create_depense(&self, new_depense: NewDepense) -> Result<Depense, DepenseRepoError> {
        query_as::<_, DepenseEntry>(
            "INSERT INTO depenses(title, amount, category, custom_category, payment_method, piece_justificative) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(new_depense.title)
        .bind(new_depense.amount)
        .bind(new_depense.category.as_str())
        .bind(new_depense.custom_category)
        .bind(new_depense.payment_method.as_str())
        .bind(new_depense.attachment)
        .fetch_one(&self.pool)
        .await
        .context("Unable to insert depense")?
        .try_into()
    }

    #[instrument(skip(self, changes))]
    async fn update_depense(
        &self,
        depense_id: i32,
        changes: DepenseChanges,
    ) -> Result<UpdatedDepense, DepenseRepoError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Unable to begin transaction")?;

        let previous_attachment: Option<String> = sqlx::query_scalar::<_, Option<String>>(
            "SELECT piece_justificative FROM depenses WHERE id = $1 FOR UPDATE",
        )
        .bind(depense_id)
        .fetch_optional(&mut *tx)
        .await
        .with_context(|| format!("Unable to lock depense {}", depense_id))?
        .ok_or(DepenseNotFound(depense_id))?;

        let mut query_builder = QueryBuilder::new("UPDATE depenses SET ");
        push_changes(&mut query_builder, changes);
        query_builder
            .push(" WHERE id = ")
            .push_bind(depense_id)
            .push(" RETURNING *");

        let entry: DepenseEntry = query_builder
            .build_query_as()
            .fetch_one(&mut *tx)
            .await
            .with_context(|| format!("Unable to update depense {}", depense_id))?;

        tx.commit()
            .await
            .with_context(|| format!("Unable to commit update of depense {}", depense_id))?;

        let depense = Depense::try_from(entry)?;
        let released_attachment =
            previous_attachment.filter(|p| depense.attachment.as_ref() != Some(p));
        Ok(UpdatedDepense {
            depense,
            released_attachment,
        })
    }

    #[instrument(skip(self))]
    async fn delete_depense(&self, depense_id: i32) -> Result<Depense, DepenseRepoError> {
        query_as::<_, DepenseEntry>("DELETE FROM depenses WHERE id = $1 RETURNING *")
            .bind(depense_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Unable to delete depense {}", depense_id))?
            .ok_or(DepenseNotFound(depense_id))?
            .try_into()
    }
}

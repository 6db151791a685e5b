use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// What a report points at. Comments have no standalone identity outside
/// their parent recipe, so a comment target carries both ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTarget {
    Recipe(Uuid),
    Ingredient(Uuid),
    Category(Uuid),
    User(Uuid),
    Comment { comment_id: Uuid, recipe_id: Uuid },
}

impl ReportTarget {
    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Recipe(_) => TargetKind::Recipe,
            Self::Ingredient(_) => TargetKind::Ingredient,
            Self::Category(_) => TargetKind::Category,
            Self::User(_) => TargetKind::User,
            Self::Comment { .. } => TargetKind::Comment,
        }
    }

    pub fn target_id(&self) -> Uuid {
        match *self {
            Self::Recipe(id)
            | Self::Ingredient(id)
            | Self::Category(id)
            | Self::User(id) => id,
            Self::Comment { comment_id, .. } => comment_id,
        }
    }

    pub fn recipe_id(&self) -> Option<Uuid> {
        match *self {
            Self::Comment { recipe_id, .. } => Some(recipe_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Recipe,
    Ingredient,
    Category,
    User,
    Comment,
}

impl TargetKind {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "recipe" => Some(Self::Recipe),
            "ingredient" => Some(Self::Ingredient),
            "category" => Some(Self::Category),
            "user" => Some(Self::User),
            "comment" => Some(Self::Comment),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Recipe => "recipe",
            Self::Ingredient => "ingredient",
            Self::Category => "category",
            Self::User => "user",
            Self::Comment => "comment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportReason {
    Inappropriate,
    Spam,
    Misleading,
    Copyright,
    Harassment,
    Other,
}

impl ReportReason {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "inappropriate" => Some(Self::Inappropriate),
            "spam" => Some(Self::Spam),
            "misleading" => Some(Self::Misleading),
            "copyright" => Some(Self::Copyright),
            "harassment" => Some(Self::Harassment),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Inappropriate => "inappropriate",
            Self::Spam => "spam",
            Self::Misleading => "misleading",
            Self::Copyright => "copyright",
            Self::Harassment => "harassment",
            Self::Other => "other",
        }
    }
}

/// Flat status set, freely settable by an admin. There is no enforced
/// ordering between the states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "reviewed" => Some(Self::Reviewed),
            "resolved" => Some(Self::Resolved),
            "dismissed" => Some(Self::Dismissed),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
            Self::Resolved => "resolved",
            Self::Dismissed => "dismissed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub target_type: TargetKind,
    pub target_id: Uuid,
    pub recipe_id: Option<Uuid>,
    pub reason: ReportReason,
    pub description: String,
    pub status: ReportStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A report with reporter and target resolved for listings. Deleted
/// reporters and targets are rendered as placeholders, not dropped.
#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    #[serde(flatten)]
    pub report: Report,
    pub reporter: ReporterView,
    pub target: TargetView,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReporterView {
    pub username: String,
    pub email: String,
}

impl ReporterView {
    pub fn deleted() -> Self {
        Self {
            username: "Deleted User".to_string(),
            email: "N/A".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetView {
    pub name: String,
}

impl TargetView {
    pub fn deleted() -> Self {
        Self {
            name: "Deleted Item".to_string(),
        }
    }
}

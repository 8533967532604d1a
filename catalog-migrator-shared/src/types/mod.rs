mod language;
mod legacy;
mod legacy_key;
mod localized_text;
mod report;
mod scope;
mod target;

pub use language::{Language, LanguageCodeError};
pub use legacy::{AssetClaim, AssetLink, Container, ContainerNode, FileAsset, LegacyNode, LessonTree, StructuralIssue, VirtualLesson};
pub use legacy_key::{EntityKind, LegacyKey};
pub use localized_text::LocalizedText;
pub use report::{
    EntityCounts, ExitStatus, LessonReport, LessonStatus, MigrationReport, RunOutcome, SkipReason,
    SkippedEntity, UpsertCounts,
};
pub use scope::MigrationScope;
pub use target::{
    CatalogCounts, Collection, CollectionDraft, CollectionWrite, ContentUnit, ContentUnitDraft,
    ContentUnitWrite, EntityDraft, FileWrite, LessonDraft, MdbFile, MdbFileDraft, StringTranslation,
    UnitDraft, Upserted, COLLECTION_TYPE, CONTENT_UNIT_TYPE,
};

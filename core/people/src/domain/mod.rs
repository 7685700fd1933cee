//! people 固有のドメイン型（型と不変条件）

pub mod card;
pub mod family;
pub mod ids;
pub mod search;

pub use card::{time_range_label, CardPatch, ExperienceCard, RelationType};
pub use family::{normalize_families, CardFamily, NormalizedFamilies};
pub use ids::{CardId, PersonId, SearchId};
pub use search::{
    page_suggests_more, ContactDetails, MoreResponse, PersonProfile, PersonSearchResult, RecentSearch,
    SearchPhase, SearchResponse, SearchSession, UnlockResponse,
};

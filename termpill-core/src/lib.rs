pub mod error;

pub mod config;

pub mod logging;

pub mod cache {
    pub mod vocab_cache;
    pub use vocab_cache::{CacheStats, CacheStatsSnapshot, CachedVocab};
}

pub mod vocab {
    pub mod api;
    pub use api::{CategorySummary, SnpValidation, ValidatedSnp, VocabApi};

    pub mod dictionary;
    pub use dictionary::{DictionaryDocument, DictionaryVocab, SnpRecord};
}

pub mod model {
    pub mod term;
    pub use term::{AlleleCount, BinConfig, SnpEntry, Term, TermBins, TermGroupSetting, TermValue};

    pub mod q;
    pub use q::{
        BinBoundary, ConditionBarBy, ConditionValueBy, CustomBin, Group, GroupSet, GroupValue,
        Knot, Q, QGroupSetting, QMode, QType,
    };

    pub mod tw;
    pub use tw::{IdentityContent, RawTermWrapper, TermIdentity, TermWrapper};

    pub mod pill_state;
    pub use pill_state::{MenuPurpose, PillPhase, PillState};
}

pub mod handlers;

pub mod controller {
    pub mod surface;
    pub use surface::{MenuSurface, MenuView, PillAction};

    pub mod handler_registry;
    pub use handler_registry::{BuiltinLoader, HandlerLoadStats, HandlerLoader, HandlerRegistry};

    pub mod resolver;
    pub use resolver::TermWrapperResolver;

    pub mod pill_controller;
    pub use pill_controller::{CommitCallback, PillController, PillLabel};
}

pub use config::Config;
pub use error::{PillError, PillResult};
pub use handlers::{DefaultQ, Handler, HandlerKind, NameOptions, PillStatus};

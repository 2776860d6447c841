//! Configuration module for Svar.

mod settings;

pub use settings::{
    AgentSettings, AnalysisSettings, CalendarSettings, DownloadSettings, GeneralSettings,
    RecordsSettings, Settings,
};

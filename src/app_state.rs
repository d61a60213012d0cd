use crate::analysis::AnalysisContext;
use crate::cli::CommandLineArgs;
use crate::resource_manager::ResourceManager;
use crate::table::{Execution, TripTable};

use std::sync::Arc;

/// Shared application state passed to each request handler.
pub struct AppState {
    /// Command line arguments.
    pub args: CommandLineArgs,

    /// Resource manager.
    pub resource_manager: ResourceManager,

    /// Analyses over the loaded trips.
    pub context: Arc<AnalysisContext>,
}

impl AppState {
    /// Create and return an [AppState].
    ///
    /// # Arguments
    ///
    /// * `args`: Command line arguments
    /// * `table`: The loaded trip records
    pub fn new(args: &CommandLineArgs, table: Arc<TripTable>) -> Self {
        let task_limit = args
            .task_limit
            .unwrap_or_else(ResourceManager::default_task_limit)
            .max(1);
        let resource_manager = ResourceManager::new(Some(task_limit));
        let execution = if args.use_rayon {
            Execution::Parallel
        } else {
            Execution::Serial
        };
        let context = AnalysisContext::new(table, execution, !args.disable_cache);

        Self {
            args: args.clone(),
            resource_manager,
            context: Arc::new(context),
        }
    }
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState = Arc<AppState>;

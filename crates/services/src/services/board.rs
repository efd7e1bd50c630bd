//! The assignment board: owns the store, processes moves one at a time and
//! serves the derived view to the UI.

use std::sync::Arc;

use models::{ColumnId, EntityId};
use serde::Serialize;
use thiserror::Error;
use tokio::{
    sync::{Mutex, RwLock, broadcast, mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use ts_rs::TS;

use super::{
    board_api::{BoardApi, BoardApiError},
    board_view::{BoardView, ViewCache},
    config::BoardConfig,
    data_store::DataStore,
    drag_monitor::DragMonitor,
    move_resolver::{MoveCommand, MoveOutcome, MoveResolver},
    registry::{FlashHandle, Registration, Registry},
};

const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, Error)]
pub enum BoardError {
    #[error("failed to load board data: {0}")]
    FetchFailed(#[from] BoardApiError),
    #[error("board is shut down")]
    Closed,
}

/// Work queued for the board worker.
#[derive(Debug)]
pub enum BoardCommand {
    Move {
        command: MoveCommand,
        reply: Option<oneshot::Sender<MoveOutcome>>,
    },
    Refresh {
        reply: Option<oneshot::Sender<Result<(), BoardError>>>,
    },
    Shutdown,
}

/// Broadcast to subscribers as the worker completes work.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoardEvent {
    Refreshed { generation: u64 },
    FetchFailed { message: String },
    MoveSettled {
        command: MoveCommand,
        outcome: MoveOutcome,
        flashed: bool,
    },
}

struct Shared {
    instance_id: String,
    store: Arc<DataStore>,
    registry: Registry,
    search_term: RwLock<String>,
    view_cache: Mutex<ViewCache>,
    events: broadcast::Sender<BoardEvent>,
}

/// Cloneable handle the UI side holds. The board stops once every handle
/// (and every monitor created from one) is dropped, or on `shutdown`.
#[derive(Clone)]
pub struct BoardHandle {
    shared: Arc<Shared>,
    commands: mpsc::Sender<BoardCommand>,
}

pub struct Board {
    shared: Arc<Shared>,
    resolver: MoveResolver,
    flash_on_move: bool,
    commands: mpsc::Receiver<BoardCommand>,
}

impl Board {
    /// Start a board worker. It loads the data, then handles commands in
    /// arrival order: a move and its refetch finish before the next command
    /// is looked at.
    pub fn spawn(api: Arc<dyn BoardApi>, config: &BoardConfig) -> (BoardHandle, JoinHandle<()>) {
        let store = Arc::new(DataStore::new(api.clone()));
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);

        let shared = Arc::new(Shared {
            instance_id: config.instance_id.clone(),
            store: store.clone(),
            registry: Registry::new(),
            search_term: RwLock::new(String::new()),
            view_cache: Mutex::new(ViewCache::default()),
            events,
        });

        let board = Self {
            shared: shared.clone(),
            resolver: MoveResolver::new(api, store),
            flash_on_move: config.flash_on_move,
            commands: rx,
        };

        let worker = tokio::spawn(async move {
            board.run().await;
        });

        (BoardHandle { shared, commands: tx }, worker)
    }

    async fn run(mut self) {
        info!(
            instance_id = %self.shared.instance_id,
            flash_on_move = self.flash_on_move,
            "Starting assignment board"
        );

        let _ = self.refresh().await;

        while let Some(command) = self.commands.recv().await {
            match command {
                BoardCommand::Move { command, reply } => {
                    let outcome = self.apply_move(command).await;
                    if let Some(reply) = reply {
                        let _ = reply.send(outcome);
                    }
                }
                BoardCommand::Refresh { reply } => {
                    let result = self.refresh().await;
                    if let Some(reply) = reply {
                        let _ = reply.send(result);
                    }
                }
                BoardCommand::Shutdown => break,
            }
        }

        info!(instance_id = %self.shared.instance_id, "Assignment board stopped");
    }

    async fn refresh(&self) -> Result<(), BoardError> {
        let event = match self.shared.store.fetch_data().await {
            Ok(snapshot) => BoardEvent::Refreshed {
                generation: snapshot.generation,
            },
            Err(e) => {
                let _ = self.shared.events.send(BoardEvent::FetchFailed {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        let _ = self.shared.events.send(event);
        Ok(())
    }

    async fn apply_move(&self, command: MoveCommand) -> MoveOutcome {
        let outcome = self.resolver.execute(&command).await;

        let flashed = self.flash_on_move
            && matches!(outcome, MoveOutcome::Applied { .. })
            && self
                .shared
                .registry
                .flash_moved(&command.athlete_id, &command.to);
        if flashed {
            debug!(athlete_id = %command.athlete_id, "Flashed moved card");
        }

        let _ = self.shared.events.send(BoardEvent::MoveSettled {
            command,
            outcome: outcome.clone(),
            flashed,
        });
        outcome
    }
}

impl BoardHandle {
    /// Current view, rebuilt only if the data, status or search changed.
    pub async fn view(&self) -> Arc<BoardView> {
        let snapshot = self.shared.store.snapshot().await;
        let status = self.shared.store.status().await;
        let search_term = self.shared.search_term.read().await.clone();

        self.shared
            .view_cache
            .lock()
            .await
            .get_or_build(&snapshot, &status, &search_term)
    }

    pub async fn search_term(&self) -> String {
        self.shared.search_term.read().await.clone()
    }

    pub async fn set_search_term(&self, term: impl Into<String>) {
        *self.shared.search_term.write().await = term.into();
    }

    /// Queue a refetch and wait for it.
    pub async fn refresh(&self) -> Result<(), BoardError> {
        let (reply, rx) = oneshot::channel();
        self.send(BoardCommand::Refresh { reply: Some(reply) })
            .await?;
        rx.await.map_err(|_| BoardError::Closed)?
    }

    /// Queue a move and wait until it and its refetch are done.
    pub async fn dispatch_move(&self, command: MoveCommand) -> Result<MoveOutcome, BoardError> {
        let (reply, rx) = oneshot::channel();
        self.send(BoardCommand::Move {
            command,
            reply: Some(reply),
        })
        .await?;
        rx.await.map_err(|_| BoardError::Closed)
    }

    pub fn monitor(&self) -> DragMonitor {
        DragMonitor::new(self.shared.instance_id.clone(), self.commands.clone())
    }

    pub fn register_card(&self, athlete_id: EntityId, flash: FlashHandle) -> Registration {
        self.shared.registry.register_card(athlete_id, flash)
    }

    pub fn register_column(&self, column: ColumnId, flash: FlashHandle) -> Registration {
        self.shared.registry.register_column(column, flash)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.shared.events.subscribe()
    }

    /// Stop the worker after the commands already queued.
    pub async fn shutdown(&self) {
        if self.commands.send(BoardCommand::Shutdown).await.is_err() {
            debug!(instance_id = %self.shared.instance_id, "Board already stopped");
        }
    }

    async fn send(&self, command: BoardCommand) -> Result<(), BoardError> {
        self.commands.send(command).await.map_err(|_| {
            warn!(instance_id = %self.shared.instance_id, "Board command after shutdown");
            BoardError::Closed
        })
    }
}

//! Async shell around a [`BoardSession`].
//!
//! The session itself is synchronous; this task is the single place it gets
//! mutated from. One `select!` loop multiplexes three inputs — inbound
//! channel signals, host commands, and a maintenance tick — and forwards the
//! resulting effects to the host. Closing the command channel (or sending
//! [`Command::Shutdown`]) drains the session and disposes it.

#[cfg(test)]
#[path = "driver_test.rs"]
mod driver_test;

use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use board::Point;
use board::element::{BoardElement, ElementId, ElementPatch};
use board::raster::ExportError;
use board::view::BoundingRect;

use crate::effect::Effect;
use crate::session::BoardSession;
use crate::transport::ChannelSignal;

/// Signaling machines are garbage-collected on this cadence; coarse is fine
/// since the shortest timeout they track is seconds.
const TICK: Duration = Duration::from_millis(500);

/// Everything the host can ask a running session to do.
pub enum Command {
    BeginStroke { start: Point },
    StrokeTo { point: Point },
    EndStroke,
    AddElement { element: BoardElement },
    UpdateElement { id: ElementId, patch: ElementPatch },
    DeleteElement { id: ElementId },
    Undo,
    Redo,
    ClearBoard,
    SetStrokeStyle { color: String, width: f64 },
    SetViewport { rect: BoundingRect, dpr: f64 },
    StartShare,
    StopShare,
    JoinVoice,
    LeaveVoice,
    ToggleMic,
    /// Snapshot the raster as PNG bytes and reply on the oneshot.
    ExportPng { reply: oneshot::Sender<Result<Vec<u8>, ExportError>> },
    Shutdown,
}

/// Host-side handle to a spawned session driver.
pub struct DriverHandle {
    commands: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl DriverHandle {
    /// Sender for host commands.
    #[must_use]
    pub fn commands(&self) -> mpsc::Sender<Command> {
        self.commands.clone()
    }

    /// Ask the session to shut down and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown).await;
        let _ = self.task.await;
    }
}

/// Spawn the driver task for a session. Returns the handle and the stream
/// of effects for the host to render.
#[must_use]
pub fn spawn(
    mut session: BoardSession,
    signals: mpsc::Receiver<ChannelSignal>,
) -> (DriverHandle, mpsc::Receiver<Effect>) {
    let (command_tx, command_rx) = mpsc::channel(64);
    let (effect_tx, effect_rx) = mpsc::channel(256);
    session.init();
    let task = tokio::spawn(run(session, signals, command_rx, effect_tx));
    (DriverHandle { commands: command_tx, task }, effect_rx)
}

/// The driver loop. Runs until the command channel closes, the signal
/// channel closes, or [`Command::Shutdown`] arrives, then disposes the
/// session (announcing leave/stop on the way out).
pub async fn run(
    mut session: BoardSession,
    mut signals: mpsc::Receiver<ChannelSignal>,
    mut commands: mpsc::Receiver<Command>,
    effects: mpsc::Sender<Effect>,
) {
    let mut ticker = tokio::time::interval(TICK);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            signal = signals.recv() => {
                let Some(signal) = signal else { break };
                forward(session.handle_signal(signal, Instant::now()), &effects);
            }
            command = commands.recv() => {
                match command {
                    None | Some(Command::Shutdown) => break,
                    Some(command) => forward(apply(&mut session, command), &effects),
                }
            }
            _ = ticker.tick() => {
                forward(session.tick(Instant::now()), &effects);
            }
        }
    }
    session.dispose();
    debug!("driver: session disposed");
}

fn apply(session: &mut BoardSession, command: Command) -> Vec<Effect> {
    match command {
        Command::BeginStroke { start } => {
            session.begin_stroke(start);
            vec![Effect::RenderNeeded]
        }
        Command::StrokeTo { point } => session.stroke_to(point),
        Command::EndStroke => session.end_stroke(),
        Command::AddElement { element } => session.add_element(element),
        Command::UpdateElement { id, patch } => session.update_element(id, patch),
        Command::DeleteElement { id } => session.delete_element(id),
        Command::Undo => session.undo(),
        Command::Redo => session.redo(),
        Command::ClearBoard => session.clear_board(),
        Command::SetStrokeStyle { color, width } => {
            session.set_stroke_style(&color, width);
            Vec::new()
        }
        Command::SetViewport { rect, dpr } => session.set_viewport(rect, dpr),
        Command::StartShare => session.start_share(),
        Command::StopShare => session.stop_share(),
        Command::JoinVoice => session.join_voice(),
        Command::LeaveVoice => session.leave_voice(),
        Command::ToggleMic => {
            session.toggle_mic();
            Vec::new()
        }
        Command::ExportPng { reply } => {
            let _ = reply.send(session.export_png());
            Vec::new()
        }
        Command::Shutdown => Vec::new(),
    }
}

fn forward(effects_out: Vec<Effect>, effects: &mpsc::Sender<Effect>) {
    for effect in effects_out {
        // Best-effort: a host that stopped draining its effects only loses
        // redraw hints, not document state.
        let _ = effects.try_send(effect);
    }
}

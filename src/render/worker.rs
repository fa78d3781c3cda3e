//! Render thread - owns a transferred canvas and the current bitmap

use flume::{Receiver, Sender};
use log::Level;

use super::bitmap::Bitmap;
use super::canvas::OffscreenCanvas;
use super::request::{RenderRequest, WorkerFault, WorkerLog, WorkerMessage};

#[derive(Default)]
struct WorkerState {
    canvas: Option<OffscreenCanvas>,
    bitmap: Option<Bitmap>,
    renders: u64,
}

enum Flow {
    Continue,
    Stop,
}

impl WorkerState {
    fn handle(&mut self, message: WorkerMessage, logs: &Sender<WorkerLog>) -> Result<Flow, WorkerFault> {
        match message {
            WorkerMessage::Init { canvas } => {
                log_to(logs, Level::Debug, format!("init canvas {}", canvas.id()));
                self.canvas = Some(canvas);
            }

            WorkerMessage::SetBitmap {
                bitmap,
                width,
                height,
            } => {
                if bitmap.dimensions() != (width, height) {
                    log_to(
                        logs,
                        Level::Warn,
                        format!(
                            "bitmap reports {:?}, message says {width}x{height}",
                            bitmap.dimensions()
                        ),
                    );
                }
                if let Some(previous) = self.bitmap.take() {
                    previous.close();
                }
                self.bitmap = Some(bitmap);
            }

            WorkerMessage::Render(request) => self.render(&request)?,

            WorkerMessage::Clear => {
                if let Some(previous) = self.bitmap.take() {
                    previous.close();
                }
                if let Some(canvas) = self.canvas.as_mut() {
                    canvas.blank();
                }
            }

            WorkerMessage::Dispose => {
                self.release_all();
                log_to(logs, Level::Debug, format!("disposed after {} renders", self.renders));
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }

    fn render(&mut self, request: &RenderRequest) -> Result<(), WorkerFault> {
        let canvas = self
            .canvas
            .as_mut()
            .ok_or(WorkerFault::NotInitialized("render"))?;
        canvas.draw(self.bitmap.as_ref(), request);
        self.renders += 1;
        Ok(())
    }

    fn release_all(&mut self) {
        if let Some(bitmap) = self.bitmap.take() {
            bitmap.close();
        }
        self.canvas = None;
    }
}

fn log_to(logs: &Sender<WorkerLog>, level: Level, payload: String) {
    let _ = logs.send(WorkerLog::new(level, payload));
}

/// Render thread body: handles messages in order until `Dispose` or until
/// the sending side hangs up.
#[expect(
    clippy::needless_pass_by_value,
    reason = "Values moved into thread, need ownership"
)]
pub fn render_worker(messages: Receiver<WorkerMessage>, logs: Sender<WorkerLog>) {
    let mut state = WorkerState::default();

    for message in messages.iter() {
        let kind = message.kind();
        match state.handle(message, &logs) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Stop) => return,
            Err(fault) => log_to(&logs, Level::Warn, format!("{kind} failed: {fault}")),
        }
    }

    state.release_all();
}

//! Host control channel and outward notifications.
//!
//! Transport between the host surfaces (popup, rendering layer) and the
//! assistant is modeled as ordinary request/response and broadcast channels:
//! requests arrive with a oneshot reply handle, results and state changes go
//! out on a broadcast. A listener must answer a readiness ping before state
//! changes are forwarded to it.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{info, warn};

use chess_core::fen::Fen;

use crate::advisor::{Advisor, AnalysisRequest};
use crate::parse::AnalysisResult;
use crate::scheduler::{run_analysis, vet_result};
use crate::Config;

/// Inbound request from a host surface.
#[derive(Debug)]
pub enum AssistantRequest {
    /// Readiness handshake.
    Ping,
    /// Flip the activation flag.
    Toggle,
    /// One-shot analysis of an explicit descriptor, outside the pipeline.
    Analyze(AnalysisRequest),
}

#[derive(Debug)]
pub enum AssistantResponse {
    Pong,
    Toggled(bool),
    Analysis(Result<AnalysisResult, String>),
}

/// A request paired with its reply handle.
#[derive(Debug)]
pub struct ControlMessage {
    pub request: AssistantRequest,
    pub reply: oneshot::Sender<AssistantResponse>,
}

/// Outward broadcast to the rendering layer.
#[derive(Debug, Clone)]
pub enum Notification {
    StateChanged(bool),
    Analysis(AnalysisResult),
}

/// Routes control messages, owns the activation flag, and gates state-change
/// notifications behind the readiness handshake.
pub struct ControlRouter<A> {
    advisor: Arc<A>,
    config: Config,
    active_tx: watch::Sender<bool>,
    notify_tx: broadcast::Sender<Notification>,
    listener_ready: bool,
}

impl<A: Advisor> ControlRouter<A> {
    pub fn new(
        advisor: Arc<A>,
        config: Config,
        active_tx: watch::Sender<bool>,
        notify_tx: broadcast::Sender<Notification>,
    ) -> Self {
        Self {
            advisor,
            config,
            active_tx,
            notify_tx,
            listener_ready: false,
        }
    }

    pub async fn run(mut self, mut control_rx: mpsc::Receiver<ControlMessage>) {
        while let Some(message) = control_rx.recv().await {
            let response = self.handle(message.request).await;
            let _ = message.reply.send(response);
        }
        info!("control channel closed, router exiting");
    }

    async fn handle(&mut self, request: AssistantRequest) -> AssistantResponse {
        match request {
            AssistantRequest::Ping => {
                self.listener_ready = true;
                AssistantResponse::Pong
            }
            AssistantRequest::Toggle => {
                let next = !*self.active_tx.borrow();
                let _ = self.active_tx.send(next);
                info!(active = next, "assistant toggled");
                if self.listener_ready {
                    let _ = self.notify_tx.send(Notification::StateChanged(next));
                } else {
                    warn!("no listener has completed the readiness handshake, state change not broadcast");
                }
                AssistantResponse::Toggled(next)
            }
            AssistantRequest::Analyze(request) => {
                AssistantResponse::Analysis(self.analyze(request).await)
            }
        }
    }

    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, String> {
        let fen: Fen = request
            .fen
            .parse()
            .map_err(|e| format!("invalid position: {e}"))?;

        let result = run_analysis(
            self.advisor.as_ref(),
            &request,
            self.config.analysis_timeout,
        )
        .await;
        Ok(vet_result(&fen, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantError;
    use chess_core::fen::{Color, STANDARD_START_FEN};

    struct CannedAdvisor;
    impl Advisor for CannedAdvisor {
        fn analyze(
            &self,
            _request: &AnalysisRequest,
        ) -> impl std::future::Future<Output = Result<AnalysisResult, AssistantError>> + Send
        {
            async {
                Ok(AnalysisResult {
                    evaluation: 0.4,
                    best_move: "e4".to_string(),
                    move_reasoning: None,
                    depth: 9,
                    alternative_moves: Vec::new(),
                })
            }
        }
    }

    fn router() -> (
        mpsc::Sender<ControlMessage>,
        watch::Receiver<bool>,
        broadcast::Receiver<Notification>,
    ) {
        let (control_tx, control_rx) = mpsc::channel(8);
        let (active_tx, active_rx) = watch::channel(false);
        let (notify_tx, notify_rx) = broadcast::channel(8);
        let router = ControlRouter::new(
            Arc::new(CannedAdvisor),
            Config::from_env(),
            active_tx,
            notify_tx,
        );
        tokio::spawn(router.run(control_rx));
        (control_tx, active_rx, notify_rx)
    }

    async fn send(
        control_tx: &mpsc::Sender<ControlMessage>,
        request: AssistantRequest,
    ) -> AssistantResponse {
        let (reply, rx) = oneshot::channel();
        control_tx
            .send(ControlMessage { request, reply })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    #[tokio::test]
    async fn test_toggle_flips_flag_and_broadcasts_after_handshake() {
        let (control_tx, active_rx, mut notify_rx) = router();

        // Before the handshake: the flag flips but nothing is broadcast
        let response = send(&control_tx, AssistantRequest::Toggle).await;
        assert!(matches!(response, AssistantResponse::Toggled(true)));
        assert!(*active_rx.borrow());
        assert!(notify_rx.try_recv().is_err());

        // Handshake, then toggle again
        assert!(matches!(
            send(&control_tx, AssistantRequest::Ping).await,
            AssistantResponse::Pong
        ));
        let response = send(&control_tx, AssistantRequest::Toggle).await;
        assert!(matches!(response, AssistantResponse::Toggled(false)));
        match notify_rx.recv().await.unwrap() {
            Notification::StateChanged(active) => assert!(!active),
            other => panic!("unexpected notification: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_analyze_resolves_with_result() {
        let (control_tx, _active_rx, _notify_rx) = router();
        let request = AnalysisRequest {
            fen: STANDARD_START_FEN.to_string(),
            side_to_move: Color::White,
            player_color: Color::White,
            history: vec![],
            context: String::new(),
        };
        match send(&control_tx, AssistantRequest::Analyze(request)).await {
            AssistantResponse::Analysis(Ok(result)) => assert_eq!(result.best_move, "e4"),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_analyze_rejects_invalid_descriptor() {
        let (control_tx, _active_rx, _notify_rx) = router();
        let request = AnalysisRequest {
            fen: "not a position".to_string(),
            side_to_move: Color::White,
            player_color: Color::White,
            history: vec![],
            context: String::new(),
        };
        match send(&control_tx, AssistantRequest::Analyze(request)).await {
            AssistantResponse::Analysis(Err(error)) => {
                assert!(error.starts_with("invalid position"))
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }
}

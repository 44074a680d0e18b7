use tokio::task::JoinHandle;
use tokio::{select, signal};
use tracing::{debug, error, warn};

use bucket_brigade::types::token::PipelineCancellationToken;

const EXIT_CODE_INTERRUPTED: i32 = 130;

/// The first ctrl-c cancels the pipeline. The current page is abandoned and
/// the run state is left untouched, so the next run repeats the interrupted
/// one. A second ctrl-c exits without waiting for running transforms.
pub fn spawn_ctrl_c_handler(cancellation_token: PipelineCancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if cancel_on_ctrl_c(&cancellation_token).await {
            exit_on_ctrl_c().await;
        }
    })
}

/// Returns true if ctrl-c cancelled the pipeline, false if it was cancelled
/// for another reason first.
async fn cancel_on_ctrl_c(cancellation_token: &PipelineCancellationToken) -> bool {
    select! {
        _ = cancellation_token.cancelled() => {
            debug!("cancellation_token canceled.");
            false
        }
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                error!("failed to listen for ctrl-c signal: {e}");
                return false;
            }

            warn!("ctrl-c received, abandoning the current page. ctrl-c again exits.");
            cancellation_token.cancel();
            true
        }
    }
}

async fn exit_on_ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => {
            error!("ctrl-c received again. exiting.");
            std::process::exit(EXIT_CODE_INTERRUPTED);
        }
        Err(e) => error!("failed to listen for ctrl-c signal: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bucket_brigade::types::token;

    use crate::cli::tests::SEMAPHORE;

    use super::*;

    const WAITING_TIME_MILLIS_FOR_HANDLER_START: u64 = 100;

    #[tokio::test]
    #[cfg(target_family = "unix")]
    async fn sigint_cancels_pipeline() {
        init_dummy_tracing_subscriber();

        let _semaphore = SEMAPHORE.clone().acquire_owned().await.unwrap();

        let cancellation_token = token::create_pipeline_cancellation_token();

        let task_token = cancellation_token.clone();
        let join_handle = tokio::spawn(async move { cancel_on_ctrl_c(&task_token).await });
        tokio::time::sleep(Duration::from_millis(WAITING_TIME_MILLIS_FOR_HANDLER_START)).await;

        send_sigint_to_self();

        assert!(join_handle.await.unwrap());
        assert!(cancellation_token.is_cancelled());
    }

    #[tokio::test]
    #[cfg(target_family = "unix")]
    async fn handler_keeps_listening_after_first_sigint() {
        init_dummy_tracing_subscriber();

        let _semaphore = SEMAPHORE.clone().acquire_owned().await.unwrap();

        let cancellation_token = token::create_pipeline_cancellation_token();

        let join_handle = spawn_ctrl_c_handler(cancellation_token.clone());
        tokio::time::sleep(Duration::from_millis(WAITING_TIME_MILLIS_FOR_HANDLER_START)).await;

        send_sigint_to_self();

        tokio::time::timeout(Duration::from_secs(5), cancellation_token.cancelled())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(WAITING_TIME_MILLIS_FOR_HANDLER_START)).await;

        // waiting for the second ctrl-c
        assert!(!join_handle.is_finished());
        join_handle.abort();
    }

    #[tokio::test]
    async fn handler_exits_when_pipeline_is_cancelled() {
        init_dummy_tracing_subscriber();

        let _semaphore = SEMAPHORE.clone().acquire_owned().await.unwrap();

        let cancellation_token = token::create_pipeline_cancellation_token();

        let join_handle = spawn_ctrl_c_handler(cancellation_token.clone());
        cancellation_token.cancel();

        join_handle.await.unwrap();

        assert!(cancellation_token.is_cancelled());
    }

    #[cfg(target_family = "unix")]
    fn send_sigint_to_self() {
        nix::sys::signal::kill(nix::unistd::Pid::this(), nix::sys::signal::Signal::SIGINT)
            .unwrap();
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}

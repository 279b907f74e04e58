use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use super::{registry, AsyncResult, CallbackId, UserData};
use crate::error::{BridgeError, BridgeResult};

/// 注册一次性回调, 返回等待异步结果的Future
///
/// 将[`AsyncReady::user_data`]与[`async_ready_trampoline`](super::async_ready_trampoline)一同传给外部异步调用.
/// 完成前丢弃Future会注销回调
pub fn ready_future() -> AsyncReady {
    let (tx, rx) = oneshot::channel();
    let tx = Mutex::new(Some(tx));

    let id = registry().register_once(
        move |_, result, _| {
            let tx = tx.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(tx) = tx {
                let _ = tx.send(result.clone());
            }
        },
        UserData::null(),
    );

    AsyncReady {
        id,
        rx,
        done: false,
    }
}

pub struct AsyncReady {
    id: CallbackId,
    rx: oneshot::Receiver<AsyncResult>,
    done: bool,
}

impl AsyncReady {
    pub fn id(&self) -> CallbackId {
        self.id
    }

    #[inline]
    pub fn user_data(&self) -> *mut () {
        self.id.as_user_data()
    }
}

impl Future for AsyncReady {
    type Output = BridgeResult<AsyncResult>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;

        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(result)) => {
                this.done = true;
                Poll::Ready(Ok(result))
            }
            Poll::Ready(Err(_)) => {
                this.done = true;
                Poll::Ready(Err(BridgeError::NotFound(format!(
                    "async callback {} was removed before completion",
                    this.id
                ))))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for AsyncReady {
    fn drop(&mut self) {
        if !self.done {
            registry().unregister(self.id);
        }
    }
}

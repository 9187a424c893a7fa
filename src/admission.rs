// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/admission.rs - 帧准入与实时分析
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

//! # 帧准入
//!
//! 相机按传感器节奏送帧，分类往往更慢。准入标志保证同一时刻最多只有
//! 一帧在分类器中：标志忙时新到的帧立即释放（丢弃而不是排队），
//! 以此限制延迟与内存占用。
//!
//! 被接纳的帧连同一个 [`Permit`] 交给专用的分析线程。分类结束后，
//! 无论成功、失败还是结果为空，帧先释放，随后标志复位，每条路径恰好一次；
//! 分类器 panic 时两者随栈展开一起释放。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  frame::{Frame, FrameId},
  model::{self, Classifier},
  presenter::{Classified, Event, Origin},
  session::{SessionClock, SessionId},
};

#[derive(Error, Debug)]
pub enum AdmissionError {
  #[error("无法启动分析线程: {0}")]
  SpawnError(#[from] std::io::Error),
}

/// 单帧在途标志
#[derive(Debug, Default)]
pub struct AdmissionGate {
  busy: AtomicBool,
}

impl AdmissionGate {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  /// 空闲 → 忙碌；已经忙碌时返回 `None`
  pub fn try_acquire(self: &Arc<Self>) -> Option<Permit> {
    self
      .busy
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| Permit { gate: self.clone() })
  }

  pub fn is_busy(&self) -> bool {
    self.busy.load(Ordering::Acquire)
  }
}

/// 持有期间标志保持忙碌，丢弃时复位
#[derive(Debug)]
pub struct Permit {
  gate: Arc<AdmissionGate>,
}

impl Drop for Permit {
  fn drop(&mut self) {
    self.gate.busy.store(false, Ordering::Release);
  }
}

/// `submit_frame` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
  /// 已交给分类器
  Forwarded(FrameId),
  /// 已有帧在途，本帧被释放
  Dropped(FrameId),
  /// 帧中没有图像数据，已释放
  NoPayload(FrameId),
}

struct Job {
  // 字段按声明顺序析构：先释放帧，再复位标志（发送失败时走这条路径）
  frame: Frame,
  _permit: Permit,
  session: SessionId,
}

/// 帧准入组件：在相机线程调用 `submit_frame`，分类在专用线程进行
pub struct Analyzer {
  gate: Arc<AdmissionGate>,
  clock: SessionClock,
  jobs: Option<Sender<Job>>,
  worker: Option<JoinHandle<()>>,
}

impl Analyzer {
  pub fn spawn<C>(
    classifier: C,
    clock: SessionClock,
    events: Sender<Event>,
  ) -> Result<Self, AdmissionError>
  where
    C: Classifier + 'static,
  {
    let (jobs, rx) = mpsc::channel::<Job>();
    let worker = std::thread::Builder::new()
      .name("analysis".to_string())
      .spawn(move || {
        info!("分析线程启动");
        for job in rx {
          let Job {
            frame,
            _permit: permit,
            session,
          } = job;
          let outcome = model::analyze(&classifier, frame.payload());
          debug!("帧 {} 分析完成: {:?}", frame.id(), outcome);
          // 结果送出前先释放帧并复位标志，主线程收到结果时下一帧已可进入
          frame.close();
          drop(permit);

          let classified = Classified {
            session,
            origin: Origin::Live,
            outcome,
          };
          if events.send(Event::Classified(classified)).is_err() {
            warn!("事件通道已关闭，分析线程退出");
            break;
          }
        }
        info!("分析线程结束");
      })?;

    Ok(Self {
      gate: AdmissionGate::new(),
      clock,
      jobs: Some(jobs),
      worker: Some(worker),
    })
  }

  pub fn gate(&self) -> &Arc<AdmissionGate> {
    &self.gate
  }

  pub fn submit_frame(&self, frame: Frame) -> Admission {
    let id = frame.id();

    let Some(permit) = self.gate.try_acquire() else {
      debug!("帧 {} 被丢弃: 已有帧在分析中", id);
      frame.close();
      return Admission::Dropped(id);
    };

    if frame.payload().is_none() {
      debug!("帧 {} 没有图像数据", id);
      frame.close();
      drop(permit);
      return Admission::NoPayload(id);
    }

    let job = Job {
      frame,
      _permit: permit,
      session: self.clock.current(),
    };
    match self.jobs.as_ref().map(|jobs| jobs.send(job)) {
      Some(Ok(())) => Admission::Forwarded(id),
      // 分析线程已退出，任务随错误一起被丢弃，帧与标志照常释放
      Some(Err(_)) | None => {
        warn!("分析线程不可用，帧 {} 被丢弃", id);
        Admission::Dropped(id)
      }
    }
  }
}

impl Drop for Analyzer {
  fn drop(&mut self) {
    self.jobs.take();
    if let Some(worker) = self.worker.take() {
      if worker.join().is_err() {
        warn!("分析线程异常退出");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn gate_admits_one_permit_at_a_time() {
    let gate = AdmissionGate::new();
    let permit = gate.try_acquire().expect("gate starts free");
    assert!(gate.is_busy());
    assert!(gate.try_acquire().is_none());
    drop(permit);
    assert!(!gate.is_busy());
    assert!(gate.try_acquire().is_some());
  }
}

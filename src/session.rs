// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/session.rs - 分析会话计数
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

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub type SessionId = u64;

/// 会话代数计数器
///
/// 没有真正的取消：异步结果带着提交时的会话号返回，
/// 与当前会话号不一致即视为过期并丢弃。
#[derive(Debug, Clone, Default)]
pub struct SessionClock {
  current: Arc<AtomicU64>,
}

impl SessionClock {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn current(&self) -> SessionId {
    self.current.load(Ordering::Acquire)
  }

  /// 开始新会话，返回新的会话号
  pub fn advance(&self) -> SessionId {
    self.current.fetch_add(1, Ordering::AcqRel) + 1
  }

  pub fn is_current(&self, session: SessionId) -> bool {
    self.current() == session
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clones_share_the_counter() {
    let clock = SessionClock::new();
    let other = clock.clone();
    let old = clock.current();
    assert_eq!(other.advance(), old + 1);
    assert!(!clock.is_current(old));
    assert!(clock.is_current(old + 1));
  }
}

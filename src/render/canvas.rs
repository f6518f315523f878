//! 单写者的表面适配器
//!
//! [`TiffCanvas`] 持有一个表面，每次渲染先领取一张递增的票据，在锁外完成
//! 解码，拿到锁后只有当票据仍是最新的才写入。旧的渲染即使后完成也不会
//! 覆盖新的结果，两次渲染也不会交错写入。

use super::renderer::{RenderBuilder, RenderOutcome};
use super::Surface;
use crate::decode::CanvasResult;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::*;

/// 一次渲染的票据，数值越大越新
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RenderTicket(u64);

impl fmt::Display for RenderTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 绑定到一个表面的渲染器
#[derive(Debug)]
pub struct TiffCanvas<S> {
    surface: Mutex<S>,
    builder: RenderBuilder,
    latest: AtomicU64,
}

impl<S: Surface> TiffCanvas<S> {
    /// 以默认配置绑定表面
    pub fn new(surface: S) -> Self {
        Self::with_builder(surface, RenderBuilder::new())
    }

    /// 以指定配置绑定表面
    pub fn with_builder(surface: S, builder: RenderBuilder) -> Self {
        Self {
            surface: Mutex::new(surface),
            builder,
            latest: AtomicU64::new(0),
        }
    }

    /// 开始一次新的渲染，之前领取的票据全部过期
    pub fn begin(&self) -> RenderTicket {
        RenderTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// 票据是否仍是最新的
    pub fn is_current(&self, ticket: RenderTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// 领取票据并渲染
    pub fn render(&self, base64: &str) -> CanvasResult<RenderOutcome> {
        let ticket = self.begin();
        self.render_ticket(ticket, base64)
    }

    /// 用已领取的票据渲染
    ///
    /// 解码在锁外进行；写入前票据已过期时返回 [`RenderOutcome::Superseded`]，
    /// 表面保持不变。
    pub fn render_ticket(&self, ticket: RenderTicket, base64: &str) -> CanvasResult<RenderOutcome> {
        let decoded = self.builder.decode(base64)?;

        let mut surface = self.surface.lock()?;
        if !self.is_current(ticket) {
            warn!("渲染 {ticket} 已被更新的渲染取代, 结果被丢弃");
            return Ok(RenderOutcome::Superseded);
        }
        RenderBuilder::present_decoded(decoded, &mut *surface)
    }

    /// 在锁内读取表面
    pub fn with_surface<R>(&self, f: impl FnOnce(&S) -> R) -> CanvasResult<R> {
        let surface = self.surface.lock()?;
        Ok(f(&surface))
    }

    /// 取回表面
    pub fn into_surface(self) -> CanvasResult<S> {
        Ok(self.surface.into_inner()?)
    }
}

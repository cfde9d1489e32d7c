use crate::{
    N8nError, Result,
    config::AppConfig,
    progress::{OperationStep, ProgressCallback, send_progress},
    system::{HealthProbe, Host, PackageManager, ServiceManager},
};
use tracing::{debug, info, warn};

/// 启动验证状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthState {
    ServiceUnknown,
    ServiceActive,
    /// 终态：HTTP 探测成功
    Responding { attempt: u32 },
    /// 终态：服务未能进入 active
    ServiceFailed,
    /// 终态：服务 active 但 HTTP 探测全部失败（警告，不算失败）
    NotResponding { attempts: u32 },
}

impl HealthState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            HealthState::Responding { .. }
                | HealthState::ServiceFailed
                | HealthState::NotResponding { .. }
        )
    }

    /// 成功但需要提示警告
    pub fn is_warning(&self) -> bool {
        matches!(self, HealthState::NotResponding { .. })
    }
}

/// 服务启动后的健康验证
pub struct HealthVerifier<'a, S, P, H> {
    config: &'a AppConfig,
    host: &'a Host<S, P, H>,
    progress: Option<&'a ProgressCallback>,
}

impl<'a, S, P, H> HealthVerifier<'a, S, P, H>
where
    S: ServiceManager,
    P: PackageManager,
    H: HealthProbe,
{
    pub fn new(
        config: &'a AppConfig,
        host: &'a Host<S, P, H>,
        progress: Option<&'a ProgressCallback>,
    ) -> Self {
        Self {
            config,
            host,
            progress,
        }
    }

    /// 运行状态机直到终态
    ///
    /// 返回 `Responding` 或 `NotResponding`；服务未进入 active 时返回 `ServiceStart` 错误。
    pub async fn verify(&self) -> Result<HealthState> {
        let mut state = HealthState::ServiceUnknown;
        while !state.is_terminal() {
            state = self.next(&state).await;
            debug!("健康检查状态: {:?}", state);
        }

        let unit = self.config.unit_name();
        match state {
            HealthState::ServiceFailed => Err(N8nError::service_start(format!(
                "{unit} 未能进入 active 状态，请查看日志: journalctl -u {unit} -n 50"
            ))),
            HealthState::NotResponding { attempts } => {
                warn!("⚠️  ==================================================");
                warn!(
                    "⚠️  警告: {} 已运行，但 {} 在 {} 次探测内没有响应",
                    unit,
                    self.config.health_url(),
                    attempts
                );
                warn!("⚠️  服务可能仍在启动，或者端口不是 {}", self.config.health.port);
                warn!("⚠️  可通过 N8N_PORT 指定端口，或查看: journalctl -u {} -f", unit);
                warn!("⚠️  ==================================================");
                Ok(state)
            }
            _ => Ok(state),
        }
    }

    async fn next(&self, state: &HealthState) -> HealthState {
        match state {
            HealthState::ServiceUnknown => self.await_active().await,
            HealthState::ServiceActive => self.poll_http().await,
            terminal => terminal.clone(),
        }
    }

    async fn await_active(&self) -> HealthState {
        let unit = self.config.unit_name();
        send_progress(
            self.progress,
            OperationStep::WaitingForService,
            &format!("等待 {unit} 启动"),
        );
        tokio::time::sleep(self.config.settle_delay()).await;

        match self.host.service.is_active(&unit).await {
            Ok(true) => {
                info!("✅ {} 已处于 active 状态", unit);
                HealthState::ServiceActive
            }
            Ok(false) => {
                warn!("❌ {} 未处于 active 状态", unit);
                HealthState::ServiceFailed
            }
            Err(e) => {
                warn!("❌ 无法查询 {} 状态: {}", unit, e);
                HealthState::ServiceFailed
            }
        }
    }

    async fn poll_http(&self) -> HealthState {
        let url = self.config.health_url();
        let max = self.config.health.attempts;
        info!("🌐 等待 HTTP 响应: {} (最多 {} 次)", url, max);

        for attempt in 1..=max {
            send_progress(
                self.progress,
                OperationStep::ProbingHttp { attempt, max },
                &format!("探测 {url} ({attempt}/{max})"),
            );
            if self.host.probe.probe(&url).await {
                info!("✅ HTTP 已响应 (第 {} 次探测)", attempt);
                return HealthState::Responding { attempt };
            }
            if attempt < max {
                tokio::time::sleep(self.config.probe_interval()).await;
            }
        }

        HealthState::NotResponding { attempts: max }
    }
}

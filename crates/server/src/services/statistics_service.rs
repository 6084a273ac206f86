/// 虚拟机用量统计
///
/// 遍历组织下全部 vDC → vApp → 虚拟机，采集当前用量后一次性批量写入。

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use common::{Error, Result};
use futures::{Stream, TryStreamExt};
use tracing::{debug, error, info};

use super::session_service::SessionService;
use super::vm_service::VmService;
use crate::app_state::AppState;
use crate::vcd::{EntityRef, Org, VcdApi, VcdResult, VmResource};

/// 按需遍历虚拟机，只在上一层耗尽时才请求下一层
pub struct VmWalker {
    api: Arc<dyn VcdApi>,
    org: Org,
    vdcs: Option<VecDeque<EntityRef>>,
    vapps: VecDeque<EntityRef>,
    vms: VecDeque<VmResource>,
}

impl VmWalker {
    pub fn new(api: Arc<dyn VcdApi>, org: Org) -> Self {
        Self {
            api,
            org,
            vdcs: None,
            vapps: VecDeque::new(),
            vms: VecDeque::new(),
        }
    }

    pub async fn next(&mut self) -> VcdResult<Option<VmResource>> {
        loop {
            if let Some(vm) = self.vms.pop_front() {
                return Ok(Some(vm));
            }
            if let Some(vapp) = self.vapps.pop_front() {
                self.vms = self.api.list_vms(&vapp).await?.into();
                continue;
            }
            if self.vdcs.is_none() {
                self.vdcs = Some(self.api.list_vdcs(&self.org).await?.into());
            }
            match self.vdcs.as_mut().and_then(VecDeque::pop_front) {
                Some(vdc) => self.vapps = self.api.list_vapps(&vdc).await?.into(),
                None => return Ok(None),
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = VcdResult<VmResource>> {
        futures::stream::try_unfold(self, |mut walker| async move {
            let next = walker.next().await;
            next.map(|vm| vm.map(|vm| (vm, walker)))
        })
    }
}

pub struct StatisticsService {
    state: AppState,
}

impl StatisticsService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// 采集一轮统计，返回写入的条数
    ///
    /// 关机的虚拟机跳过，其它任何错误中止本轮且不写入
    pub async fn run_statistics_collection(&self) -> Result<usize> {
        let session = SessionService::new(self.state.clone()).setup().await?;
        let api = session.api();
        let vm_service = VmService::new(self.state.clone(), &session);

        let org = api.get_org().await?;
        let mut vms = Box::pin(VmWalker::new(api, org).into_stream());
        let mut batch: HashMap<i32, serde_json::Value> = HashMap::new();

        while let Some(vm) = vms.try_next().await.map_err(Error::from)? {
            let usage = match vm_service.current_usage_of(&vm).await {
                Ok(usage) => usage,
                Err(Error::VmPowerState(msg)) => {
                    debug!(vm_id = %vm.id, "跳过: {}", msg);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let record = self.state.vm_repo.get_or_create(&vm.id, &vm.name).await?;
            let value = serde_json::to_value(&usage).map_err(|e| Error::Internal(e.to_string()))?;
            batch.insert(record.id, value);
        }

        let collected = batch.len();
        if collected > 0 {
            self.state.vm_repo.bulk_create_statistics(batch).await?;
        }
        Ok(collected)
    }
}

/// 启动周期性统计任务
pub fn start_statistics_collector(state: AppState, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

        loop {
            interval.tick().await;

            let service = StatisticsService::new(state.clone());
            match service.run_statistics_collection().await {
                Ok(0) => debug!("统计任务: 没有可采集的虚拟机"),
                Ok(count) => info!("统计任务: 已写入 {} 台虚拟机的用量", count),
                Err(e) => error!("统计任务失败: {}", e),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{entity, vm_resource, MockVcd, TestContext};
    use crate::vcd::VcdError;
    use common::VmMetric;

    fn metric(value: &str) -> VmMetric {
        VmMetric {
            metric_name: "mem.usage.average".into(),
            unit: "PERCENT".into(),
            value: value.into(),
        }
    }

    fn two_vdcs() -> MockVcd {
        MockVcd {
            issued_token: "token".into(),
            inventory: vec![
                (
                    entity("vdc-a"),
                    vec![(entity("vapp-a"), vec![vm_resource("1", 4, &[]), vm_resource("2", 8, &[])])],
                ),
                (entity("vdc-b"), vec![(entity("vapp-b"), vec![vm_resource("3", 4, &[])])]),
            ],
            ..Default::default()
        }
    }

    async fn walker(ctx: &TestContext) -> VmWalker {
        let session = SessionService::new(ctx.state.clone()).setup().await.unwrap();
        let api = session.api();
        let org = api.get_org().await.unwrap();
        VmWalker::new(api, org)
    }

    #[tokio::test]
    async fn test_skips_powered_off_vms() {
        let mut vcd = two_vdcs();
        vcd.metrics.insert("1".into(), Ok(vec![metric("40")]));
        vcd.metrics.insert("2".into(), Err(VcdError::OperationNotSupported("no metrics link".into())));
        vcd.metrics.insert("3".into(), Ok(vec![metric("7")]));
        let ctx = TestContext::new(vcd);

        let collected = StatisticsService::new(ctx.state.clone()).run_statistics_collection().await.unwrap();
        assert_eq!(collected, 2);

        let batches = ctx.vms.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        let vms = ctx.vms.vms.lock().unwrap();
        let ids: Vec<&str> = vms.iter().map(|v| v.remote_vm_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(batches[0][&vms[0].id], serde_json::json!([
            {"metric_name": "mem.usage.average", "unit": "PERCENT", "value": "40"}
        ]));
    }

    #[tokio::test]
    async fn test_nothing_collected_writes_nothing() {
        let mut vcd = two_vdcs();
        for id in ["1", "2", "3"] {
            vcd.metrics.insert(id.into(), Err(VcdError::OperationNotSupported("off".into())));
        }
        let ctx = TestContext::new(vcd);

        let collected = StatisticsService::new(ctx.state.clone()).run_statistics_collection().await.unwrap();
        assert_eq!(collected, 0);
        assert!(ctx.vms.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_errors_abort_the_run() {
        let mut vcd = two_vdcs();
        vcd.metrics.insert("2".into(), Err(VcdError::InternalServer("boom".into())));
        let ctx = TestContext::new(vcd);

        let err = StatisticsService::new(ctx.state.clone()).run_statistics_collection().await.unwrap_err();
        assert!(err.is_internal());
        assert!(ctx.vms.batches.lock().unwrap().is_empty());
        assert!(!ctx.vcd.called("list_vapps:vdc-b"));
    }

    #[tokio::test]
    async fn test_walker_is_lazy() {
        let ctx = TestContext::new(two_vdcs());
        let mut walker = walker(&ctx).await;

        let first = walker.next().await.unwrap().unwrap();
        assert_eq!(first.id, "1");
        assert!(ctx.vcd.called("list_vms:vapp-a"));
        assert!(!ctx.vcd.called("list_vapps:vdc-b"));

        let mut rest = Vec::new();
        while let Some(vm) = walker.next().await.unwrap() {
            rest.push(vm.id);
        }
        assert_eq!(rest, vec!["2", "3"]);
        assert!(walker.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_walker_stream() {
        let ctx = TestContext::new(two_vdcs());
        let vms: Vec<VmResource> = walker(&ctx).await.into_stream().try_collect().await.unwrap();
        assert_eq!(vms.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_org() {
        let ctx = TestContext::new(MockVcd::default());
        let collected = StatisticsService::new(ctx.state.clone()).run_statistics_collection().await.unwrap();
        assert_eq!(collected, 0);
        assert!(ctx.vms.batches.lock().unwrap().is_empty());
    }
}

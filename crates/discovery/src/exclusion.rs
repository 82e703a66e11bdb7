//! 버전 제외 그래프
//!
//! 간선 `(A, B)`는 "버전 A는 버전 B에 의해 대체됨"을 뜻합니다.
//! 같은 경로에서 A의 후속 버전(직접 또는 간접)이 탐지되면 A의 탐지는 제거됩니다.
//!
//! 탐색은 방문 집합을 가진 명시적 스택으로 수행되며, 순환을 만나면
//! [`DiscoveryError::ExclusionCycle`]을 반환합니다.

use std::collections::{HashMap, HashSet};

use crate::error::DiscoveryError;
use crate::types::VersionId;

/// 버전 제외 후속 그래프
#[derive(Debug, Default, Clone)]
pub struct ExclusionGraph {
    successors: HashMap<VersionId, Vec<VersionId>>,
    edge_count: usize,
}

impl ExclusionGraph {
    /// 빈 그래프를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 간선을 추가합니다. 중복 간선은 무시합니다.
    pub fn add_edge(&mut self, excluded: VersionId, superseding: VersionId) {
        let list = self.successors.entry(excluded).or_default();
        if !list.contains(&superseding) {
            list.push(superseding);
            self.edge_count += 1;
        }
    }

    /// 직접 후속 버전 목록 (로드 순서)
    pub fn successors(&self, version: VersionId) -> &[VersionId] {
        self.successors
            .get(&version)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 간선 수
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// 간선이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }

    /// `version`에서 도달 가능한 후속 버전 중 `present`를 만족하는 것이 있는지 확인합니다.
    ///
    /// 첫 번째로 발견된 존재 버전에서 즉시 `true`를 반환합니다.
    ///
    /// # Errors
    ///
    /// 탐색 중인 경로 위의 버전으로 되돌아오는 간선을 만나면
    /// `DiscoveryError::ExclusionCycle`을 반환합니다.
    pub fn is_excluded(
        &self,
        version: VersionId,
        present: impl Fn(VersionId) -> bool,
    ) -> Result<bool, DiscoveryError> {
        let mut on_path: HashSet<VersionId> = HashSet::from([version]);
        let mut finished: HashSet<VersionId> = HashSet::new();
        let mut stack: Vec<(VersionId, usize)> = vec![(version, 0)];

        while let Some((node, cursor)) = stack.last_mut() {
            let node = *node;
            let successors = self.successors(node);
            let Some(&next) = successors.get(*cursor) else {
                stack.pop();
                on_path.remove(&node);
                finished.insert(node);
                continue;
            };
            *cursor += 1;

            if on_path.contains(&next) {
                return Err(DiscoveryError::ExclusionCycle { version: next });
            }
            if present(next) {
                return Ok(true);
            }
            if finished.contains(&next) {
                continue;
            }
            on_path.insert(next);
            stack.push((next, 0));
        }

        Ok(false)
    }

    /// 그래프에서 순환 하나를 찾아 경로를 반환합니다.
    ///
    /// 반환 경로는 순환 시작 버전으로 끝나며(`[a, b, c, a]`), 순환이 없으면 `None`입니다.
    pub fn find_cycle(&self) -> Option<Vec<VersionId>> {
        let mut roots: Vec<VersionId> = self.successors.keys().copied().collect();
        roots.sort();

        let mut finished: HashSet<VersionId> = HashSet::new();
        for root in roots {
            if finished.contains(&root) {
                continue;
            }
            let mut path: Vec<VersionId> = vec![root];
            let mut stack: Vec<(VersionId, usize)> = vec![(root, 0)];

            while let Some((node, cursor)) = stack.last_mut() {
                let node = *node;
                let Some(&next) = self.successors(node).get(*cursor) else {
                    stack.pop();
                    path.pop();
                    finished.insert(node);
                    continue;
                };
                *cursor += 1;

                if let Some(pos) = path.iter().position(|v| *v == next) {
                    let mut cycle = path[pos..].to_vec();
                    cycle.push(next);
                    return Some(cycle);
                }
                if finished.contains(&next) {
                    continue;
                }
                path.push(next);
                stack.push((next, 0));
            }
        }
        None
    }
}

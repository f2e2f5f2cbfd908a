//! Mixin oracles for ring building.

use std::collections::BTreeMap;

use cryptonote_rpc::{GetRandomOutputsRequest, NodeRpc, RandomOutput};
use tx_builder::Amount;

/// Source of amount-matched decoy outputs.
pub trait MixinOracle {
    fn random_outputs(
        &self,
        amounts: &[Amount],
        outs_count: usize,
    ) -> anyhow::Result<BTreeMap<Amount, Vec<RandomOutput>>>;
}

/// No-op oracle useful for tests and zero-anonymity spends.
pub struct NoopMixinOracle;

impl MixinOracle for NoopMixinOracle {
    fn random_outputs(
        &self,
        _amounts: &[Amount],
        _outs_count: usize,
    ) -> anyhow::Result<BTreeMap<Amount, Vec<RandomOutput>>> {
        Ok(BTreeMap::new())
    }
}

/// Node-backed oracle. Requests extra headroom per amount so that real
/// output collisions can be discarded without exhausting the pool.
pub struct RpcMixinOracle {
    pub rpc: NodeRpc,
    pub confirmed_height_or_depth: i64,
}

impl MixinOracle for RpcMixinOracle {
    fn random_outputs(
        &self,
        amounts: &[Amount],
        outs_count: usize,
    ) -> anyhow::Result<BTreeMap<Amount, Vec<RandomOutput>>> {
        let mut multiplicity: BTreeMap<Amount, usize> = BTreeMap::new();
        for &amount in amounts {
            *multiplicity.entry(amount).or_default() += 1;
        }
        let max_repeat = multiplicity.values().copied().max().unwrap_or(1);
        let response = self.rpc.get_random_outputs(&GetRandomOutputsRequest {
            amounts: multiplicity.keys().copied().collect(),
            outs_count: (outs_count + 1) * max_repeat,
            confirmed_height_or_depth: self.confirmed_height_or_depth,
        })?;
        Ok(response.outputs)
    }
}

use bvgraph::prelude::*;

fn graph_to_vec(n: usize, arcs: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut succ = vec![Vec::new(); n];
    for &(u, v) in arcs {
        succ[u].push(v);
    }
    for list in &mut succ {
        list.sort_unstable();
    }
    succ
}

fn roundtrip(succ: Vec<Vec<usize>>, flags: CompFlags) {
    let dir = tempfile::tempdir().unwrap();
    let basename = dir.path().join("graph");
    let stats = compress_to_basename(&basename, flags, succ.clone()).unwrap();
    assert_eq!(stats.num_nodes, succ.len());
    assert_eq!(
        stats.num_arcs,
        succ.iter().map(|s| s.len() as u64).sum::<u64>()
    );

    let seq = BvGraphSeq::with_basename(&basename).unwrap();
    assert_eq!(seq.num_nodes(), succ.len());
    let decoded: Vec<Vec<usize>> = seq.iter().map(|r| r.unwrap().1).collect();
    assert_eq!(decoded, succ);

    for mode in [LoadMode::Standard, LoadMode::Mapped, LoadMode::Offline] {
        let random = BvGraph::with_basename(&basename, mode).unwrap();
        assert_eq!(random.num_nodes(), succ.len());
        for (node, expected) in succ.iter().enumerate() {
            assert_eq!(&random.successors(node).unwrap(), expected);
            assert_eq!(random.outdegree(node).unwrap(), expected.len());
        }
    }
}

#[test]
fn default_codes() {
    let succ = graph_to_vec(4, &[(0, 1), (0, 2), (1, 3), (2, 3), (3, 0)]);
    roundtrip(succ, CompFlags::default());
}

#[test]
fn empty_graph() {
    roundtrip(vec![Vec::new(); 5], CompFlags::default());
}

#[test]
fn no_reference_compression() {
    let succ = graph_to_vec(4, &[(0, 1), (0, 2), (1, 2), (1, 3), (2, 3)]);
    roundtrip(
        succ,
        CompFlags {
            compression_window: 0,
            ..CompFlags::default()
        },
    );
}

#[test]
fn no_intervals() {
    let succ = graph_to_vec(3, &[(0, 1), (0, 2), (1, 2), (2, 0)]);
    roundtrip(
        succ,
        CompFlags {
            min_interval_length: 0,
            ..CompFlags::default()
        },
    );
}

#[test]
fn interval_encoding() {
    let mut arcs = Vec::new();
    for i in 10..30 {
        arcs.push((0usize, i));
    }
    arcs.push((1, 5));
    let succ = graph_to_vec(30, &arcs);
    roundtrip(
        succ,
        CompFlags {
            min_interval_length: 4,
            ..CompFlags::default()
        },
    );
}

#[test]
fn large_window_shared_successors() {
    let mut arcs = Vec::new();
    for i in 0..20usize {
        for j in 0..5usize {
            arcs.push((i, (i + j + 1) % 25));
        }
    }
    let succ = graph_to_vec(25, &arcs);
    roundtrip(
        succ,
        CompFlags {
            compression_window: 15,
            max_ref_count: 10,
            ..CompFlags::default()
        },
    );
}

#[test]
fn chain_graph() {
    let arcs: Vec<_> = (0..100usize).map(|i| (i, i + 1)).collect();
    let succ = graph_to_vec(101, &arcs);
    roundtrip(succ, CompFlags::default());
}

#[test]
fn star_graph() {
    let arcs: Vec<_> = (1..50usize).map(|i| (0, i)).collect();
    let succ = graph_to_vec(50, &arcs);
    roundtrip(
        succ,
        CompFlags {
            min_interval_length: 4,
            ..CompFlags::default()
        },
    );
}

#[test]
fn dense_graph() {
    let mut arcs = Vec::new();
    for i in 0..10usize {
        for j in 0..10usize {
            if i != j {
                arcs.push((i, j));
            }
        }
    }
    let succ = graph_to_vec(10, &arcs);
    roundtrip(succ, CompFlags::default());
}

#[test]
fn zeta_codes_must_share_k() {
    let succ = graph_to_vec(6, &[(0, 1), (0, 5), (1, 2), (2, 3)]);
    roundtrip(
        succ,
        CompFlags {
            outdegrees: Codes::Zeta(5),
            references: Codes::Zeta(5),
            blocks: Codes::Zeta(5),
            intervals: Codes::Zeta(5),
            residuals: Codes::Zeta(5),
            ..CompFlags::default()
        },
    );
}

#[test]
fn delta_codes() {
    let succ = graph_to_vec(5, &[(0, 1), (0, 5), (0, 10), (1, 2), (2, 3)]);
    roundtrip(
        succ,
        CompFlags {
            outdegrees: Codes::Delta,
            references: Codes::Gamma,
            blocks: Codes::Delta,
            intervals: Codes::Delta,
            residuals: Codes::Delta,
            ..CompFlags::default()
        },
    );
}

#[test]
fn recompress_with_different_flags_preserves_structure() {
    let succ = graph_to_vec(4, &[(0, 1), (0, 2), (1, 3)]);
    let dir = tempfile::tempdir().unwrap();
    let basename1 = dir.path().join("orig");
    compress_to_basename(&basename1, CompFlags::default(), succ.clone()).unwrap();

    let seq = BvGraphSeq::with_basename(&basename1).unwrap();
    let reloaded: Vec<Vec<usize>> = seq.iter().map(|r| r.unwrap().1).collect();

    let basename2 = dir.path().join("recomp");
    let new_flags = CompFlags {
        outdegrees: Codes::Delta,
        residuals: Codes::Delta,
        ..CompFlags::default()
    };
    compress_to_basename(&basename2, new_flags, reloaded.clone()).unwrap();

    let seq2 = BvGraphSeq::with_basename(&basename2).unwrap();
    let decoded2: Vec<Vec<usize>> = seq2.iter().map(|r| r.unwrap().1).collect();
    assert_eq!(decoded2, succ);
}

#[cfg(feature = "slow_tests")]
#[test]
fn erdos_renyi_round_trips_across_many_seeds() {
    for seed in 0..20u64 {
        let gen = ErdosRenyi::new(80, 0.08, seed);
        let succ: Vec<Vec<usize>> = gen.iter().map(|(_, s)| s).collect();
        roundtrip(succ, CompFlags::default());
    }
}

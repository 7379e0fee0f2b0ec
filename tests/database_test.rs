use plume::store::{DataManager, IdManager, ValueManager};
use plume::{PlumeError, Result};

use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn test_data_manager_sparse_ids() {
    let dir = tempdir().unwrap();
    let data = DataManager::create(dir.path(), 5, 1 << 20).unwrap();
    data.append(3, b"aa").unwrap();

    assert_eq!(data.read_data(3).unwrap(), b"aa".to_vec());
    assert!(data.read_data(2).unwrap_err().is_not_found());
    assert!(matches!(data.append(6, b"x"), Err(PlumeError::OutOfBounds(_))));
    assert!(matches!(data.read_data(6), Err(PlumeError::OutOfBounds(_))));
    data.close().unwrap();
    drop(data);

    let data = DataManager::open(dir.path()).unwrap();
    assert_eq!(data.read_data(3).unwrap(), b"aa".to_vec());
}

#[test]
fn test_id_allocation_is_dense_and_reversible() -> Result<()> {
    let dir = tempdir().unwrap();
    let ids = Arc::new(IdManager::create(dir.path(), 1000)?);

    let handles: Vec<_> = (0..4u32)
        .map(|t| {
            let ids = ids.clone();
            std::thread::spawn(move || {
                (0..100u32)
                    .map(|i| {
                        let out_id = t * 1000 + i + 1;
                        (ids.alloc_id(out_id).unwrap(), out_id)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut pairs: Vec<(u32, u32)> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    pairs.sort_unstable();

    let in_ids: Vec<u32> = pairs.iter().map(|&(in_id, _)| in_id).collect();
    assert_eq!(in_ids, (1..=400).collect::<Vec<_>>());
    for &(in_id, out_id) in &pairs {
        assert_eq!(ids.get_out_id(in_id)?, out_id);
    }
    Ok(())
}

#[test]
fn test_value_manager_pads_and_truncates() -> Result<()> {
    let dir = tempdir().unwrap();
    {
        let values = ValueManager::create(dir.path(), 10, 4)?;
        values.write_value(1, b"ab")?;
        values.write_value(2, b"abcdefgh")?;
        values.sync()?;
    }
    let values = ValueManager::open(dir.path())?;
    assert_eq!(values.read_value(1)?, b"ab\0\0".to_vec());
    assert_eq!(values.read_value(2)?, b"abcd".to_vec());
    assert_eq!(values.read_value(3)?, vec![0; 4]);
    assert!(values.write_value(11, b"x").is_err());
    Ok(())
}

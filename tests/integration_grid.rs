//! Integration tests against a live Redis with the grid module loaded.
//!
//! These tests require a running Redis at `REDIS_URL` (default
//! `localhost:6379`) started with `--loadmodule` pointing at the grid module.

mod common;

use common::{redis_url, test_key};
use redis_grid::{
    Ack, BlockingGridClient, Grid, GridClient, GridPipeline, GridReply, RedisConnection,
};

async fn client() -> GridClient<redis::aio::MultiplexedConnection> {
    let conn = RedisConnection::new(&redis_url())
        .unwrap()
        .get_async_connection()
        .await
        .unwrap();
    GridClient::new(conn)
}

#[tokio::test]
#[ignore] // Requires Redis with the grid module
async fn test_dim_dump_and_shape() {
    let key = test_key("dim_dump");
    let mut grid = client().await;

    let ack = grid.grid_dim(&key, 2, 3, [1, 2, 3, 4, 5, 6]).await.unwrap();
    assert_eq!(ack, Ack::Ok);

    assert_eq!(grid.grid_shape(&key).await.unwrap(), (2, 3));

    let dump = grid.grid_dump(&key).await.unwrap().into_grid().unwrap();
    assert_eq!(
        dump.into_rows(),
        vec![
            vec![Some("1".into()), Some("2".into()), Some("3".into())],
            vec![Some("4".into()), Some("5".into()), Some("6".into())],
        ]
    );
}

#[tokio::test]
#[ignore] // Requires Redis with the grid module
async fn test_set_and_range() {
    let key = test_key("set_range");
    let mut grid = client().await;

    grid.grid_dim(&key, 3, 3, Vec::<&str>::new()).await.unwrap();
    let block = Grid::from_rows(vec![vec!["a", "b"], vec!["c", "d"]]).unwrap();
    grid.grid_set_grid(&key, 1, 1, &block).await.unwrap();

    let corner = grid.grid_range(&key, 1, 2, 1, 2).await.unwrap();
    assert_eq!(corner.cells(), block.cells());

    let last_row = grid.grid_range(&key, -1, -1, 0, -1).await.unwrap();
    assert_eq!(last_row.shape(), (1, 3));
}

#[tokio::test]
#[ignore] // Requires Redis with the grid module
async fn test_pipeline_round_trip() {
    let key = test_key("pipeline");
    let mut conn = RedisConnection::new(&redis_url())
        .unwrap()
        .get_async_connection()
        .await
        .unwrap();

    let mut pipe = GridPipeline::new();
    pipe.dim(&key, 1, 2, ["x", "y"]).unwrap().shape(&key).dump(&key);
    let result = pipe.execute(&mut conn).await.unwrap();

    assert!(result.all_succeeded());
    assert_eq!(result.get(1), Some(&GridReply::Shape(1, 2)));
}

#[test]
#[ignore] // Requires Redis with the grid module
fn test_blocking_client() {
    let key = test_key("blocking");
    let mut client = BlockingGridClient::new(&redis_url()).unwrap();

    client.grid_dim(&key, 1, 1, ["only"]).unwrap();
    assert!(client.is_connected());
    assert_eq!(client.grid_shape(&key).unwrap(), (1, 1));
}

#[cfg(feature = "dataframe")]
#[tokio::test]
#[ignore] // Requires Redis with the grid module
async fn test_table_round_trip() {
    use std::sync::Arc;

    use arrow::array::{Float64Array, RecordBatch, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};

    let key = test_key("table");
    let mut grid = client().await;

    let schema = Arc::new(Schema::new(vec![
        Field::new("name", DataType::Utf8, true),
        Field::new("score", DataType::Float64, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(vec!["a", "b", "c"])),
            Arc::new(Float64Array::from(vec![1.5, 2.0, -3.25])),
        ],
    )
    .unwrap();

    grid.grid_save_table(&key, &batch, true).await.unwrap();
    let restored = grid.grid_load_table(&key, true).await.unwrap();

    assert_eq!(restored.schema(), schema);
    assert_eq!(restored, batch);
}

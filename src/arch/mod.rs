pub mod accumulator;
pub mod matrix;
pub mod ppu;
pub mod tile;

pub use accumulator::{matmul, partial, AccumulatorState, GemmAccumulator, TileStep, TiledGemm};
pub use matrix::{AccMatrix, ElemMatrix, Element, Matrix};
pub use ppu::{BiasStage, PipelineConfig, RequantTrace, Requantizer};
pub use tile::{GemmDims, Tile, TileOrder, TileScheduler, TileShape};

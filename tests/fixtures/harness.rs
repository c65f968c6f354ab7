//! Minimal IR for running a generated rewrite unit.
//!
//! Compiled next to `rewrite_generic.rs` by `tests/runtime.rs`.

#![allow(dead_code)]

mod rewrite_generic;

use rewrite_generic::{rewrite_block_generic, rewrite_value_generic};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockId(usize);

pub type Pos = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Arg,
    Copy,
    Phi,
    Add64,
    Sub64,
    Mul64,
    Neg64,
    Not,
    IsNonNil,
    Less64,
    Const64,
    ConstBool,
    ConstString,
    Addr,
    OffPtr,
    Load,
    Store,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Plain,
    If,
    First,
    Exit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Type {
    Int64,
    Bool,
    BytePtr,
    Flags,
    Mem,
    Void,
    Int128,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchPrediction {
    Likely,
    Unlikely,
    Unknown,
}

impl BranchPrediction {
    pub fn invert(self) -> Self {
        match self {
            BranchPrediction::Likely => BranchPrediction::Unlikely,
            BranchPrediction::Unlikely => BranchPrediction::Likely,
            BranchPrediction::Unknown => BranchPrediction::Unknown,
        }
    }
}

#[derive(Default)]
pub struct Frontend;

impl Frontend {
    pub fn type_int64(&self) -> Type {
        Type::Int64
    }

    pub fn type_bool(&self) -> Type {
        Type::Bool
    }

    pub fn type_byte_ptr(&self) -> Type {
        Type::BytePtr
    }
}

#[derive(Default)]
pub struct Config {
    pub fe: Frontend,
}

struct Value {
    op: Op,
    ty: Type,
    aux_int: i64,
    aux: Option<String>,
    args: Vec<ValueId>,
    block: BlockId,
    pos: Pos,
}

struct Block {
    kind: BlockKind,
    control: Option<ValueId>,
    succs: Vec<BlockId>,
    preds: Vec<BlockId>,
    likely: BranchPrediction,
    pos: Pos,
}

#[derive(Default)]
pub struct Func {
    values: Vec<Value>,
    blocks: Vec<Block>,
}

impl Func {
    pub fn new_block(&mut self, kind: BlockKind) -> BlockId {
        self.blocks.push(Block {
            kind,
            control: None,
            succs: Vec::new(),
            preds: Vec::new(),
            likely: BranchPrediction::Unknown,
            pos: 0,
        });
        BlockId(self.blocks.len() - 1)
    }

    pub fn new_value(&mut self, b: BlockId, pos: Pos, op: Op, ty: Type) -> ValueId {
        self.values.push(Value {
            op,
            ty,
            aux_int: 0,
            aux: None,
            args: Vec::new(),
            block: b,
            pos,
        });
        ValueId(self.values.len() - 1)
    }

    fn value(&mut self, b: BlockId, op: Op, aux_int: i64, args: &[ValueId]) -> ValueId {
        let v = self.new_value(b, 0, op, Type::Int64);
        self.values[v.0].aux_int = aux_int;
        self.values[v.0].args = args.to_vec();
        v
    }

    fn add_edge(&mut self, from: BlockId, to: BlockId) {
        self.blocks[from.0].succs.push(to);
        self.blocks[to.0].preds.push(from);
    }

    pub fn op(&self, v: ValueId) -> Op {
        self.values[v.0].op
    }

    pub fn ty(&self, v: ValueId) -> Type {
        self.values[v.0].ty
    }

    pub fn aux_int(&self, v: ValueId) -> i64 {
        self.values[v.0].aux_int
    }

    pub fn aux(&self, v: ValueId) -> Option<&str> {
        self.values[v.0].aux.as_deref()
    }

    pub fn args(&self, v: ValueId) -> &[ValueId] {
        &self.values[v.0].args
    }

    pub fn block_of(&self, v: ValueId) -> BlockId {
        self.values[v.0].block
    }

    pub fn pos(&self, v: ValueId) -> Pos {
        self.values[v.0].pos
    }

    pub fn block_pos(&self, b: BlockId) -> Pos {
        self.blocks[b.0].pos
    }

    pub fn reset(&mut self, v: ValueId, op: Op) {
        let value = &mut self.values[v.0];
        value.op = op;
        value.aux_int = 0;
        value.aux = None;
        value.args.clear();
    }

    pub fn set_type(&mut self, v: ValueId, ty: Type) {
        self.values[v.0].ty = ty;
    }

    pub fn set_aux_int(&mut self, v: ValueId, aux_int: i64) {
        self.values[v.0].aux_int = aux_int;
    }

    pub fn add_arg(&mut self, v: ValueId, arg: ValueId) {
        self.values[v.0].args.push(arg);
    }

    pub fn block_kind(&self, b: BlockId) -> BlockKind {
        self.blocks[b.0].kind
    }

    pub fn control(&self, b: BlockId) -> Option<ValueId> {
        self.blocks[b.0].control
    }

    pub fn succs(&self, b: BlockId) -> &[BlockId] {
        &self.blocks[b.0].succs
    }

    pub fn set_block_kind(&mut self, b: BlockId, kind: BlockKind) {
        self.blocks[b.0].kind = kind;
    }

    pub fn set_control(&mut self, b: BlockId, control: Option<ValueId>) {
        self.blocks[b.0].control = control;
    }

    pub fn truncate_succs(&mut self, b: BlockId, len: usize) {
        self.blocks[b.0].succs.truncate(len);
    }

    pub fn set_succ(&mut self, b: BlockId, i: usize, succ: BlockId) {
        self.blocks[b.0].succs[i] = succ;
    }

    pub fn remove_predecessor(&mut self, b: BlockId, succ: BlockId) {
        self.blocks[succ.0].preds.retain(|&p| p != b);
    }

    pub fn likely(&self, b: BlockId) -> BranchPrediction {
        self.blocks[b.0].likely
    }

    pub fn set_likely(&mut self, b: BlockId, likely: BranchPrediction) {
        self.blocks[b.0].likely = likely;
    }
}

fn values() {
    let config = Config::default();
    let mut f = Func::default();
    let b = f.new_block(BlockKind::Plain);
    let x = f.value(b, Op::Arg, 0, &[]);
    let y = f.value(b, Op::Arg, 0, &[]);
    f.set_type(x, Type::BytePtr);

    // (Sub64 x x) only fires when both arguments are the same value.
    let same = f.value(b, Op::Sub64, 0, &[x, x]);
    assert!(rewrite_value_generic(&mut f, same, &config));
    assert_eq!(f.op(same), Op::Const64);
    assert_eq!(f.aux_int(same), 0);
    assert!(f.args(same).is_empty());

    let distinct = f.value(b, Op::Sub64, 0, &[x, y]);
    assert!(!rewrite_value_generic(&mut f, distinct, &config));
    assert_eq!(f.op(distinct), Op::Sub64);
    assert_eq!(f.args(distinct), &[x, y]);

    // Adding zero becomes a copy carrying the operand's type.
    let zero = f.value(b, Op::Const64, 0, &[]);
    let add = f.value(b, Op::Add64, 0, &[x, zero]);
    assert!(rewrite_value_generic(&mut f, add, &config));
    assert_eq!(f.op(add), Op::Copy);
    assert_eq!(f.args(add), &[x]);
    assert_eq!(f.ty(add), Type::BytePtr);

    let one = f.value(b, Op::Const64, 1, &[]);
    let add = f.value(b, Op::Add64, 0, &[x, one]);
    assert!(!rewrite_value_generic(&mut f, add, &config));

    // Nested match on an unnamed child.
    let inner = f.value(b, Op::Neg64, 0, &[y]);
    let outer = f.value(b, Op::Neg64, 0, &[inner]);
    assert!(rewrite_value_generic(&mut f, outer, &config));
    assert_eq!(f.op(outer), Op::Copy);
    assert_eq!(f.args(outer), &[y]);
    assert!(!rewrite_value_generic(&mut f, inner, &config));

    // No rules for Mul64.
    let mul = f.value(b, Op::Mul64, 0, &[x, y]);
    assert!(!rewrite_value_generic(&mut f, mul, &config));
}

fn blocks() {
    let config = Config::default();
    let mut f = Func::default();
    let entry = f.new_block(BlockKind::If);
    let yes = f.new_block(BlockKind::Exit);
    let no = f.new_block(BlockKind::Exit);
    f.add_edge(entry, yes);
    f.add_edge(entry, no);

    // (If (Not cond) yes no) swaps the successors and inverts the prediction.
    let cond = f.value(entry, Op::Arg, 0, &[]);
    let not = f.value(entry, Op::Not, 0, &[cond]);
    f.set_control(entry, Some(not));
    f.set_likely(entry, BranchPrediction::Likely);
    assert!(rewrite_block_generic(&mut f, entry, &config));
    assert_eq!(f.block_kind(entry), BlockKind::If);
    assert_eq!(f.control(entry), Some(cond));
    assert_eq!(f.succs(entry), &[no, yes]);
    assert_eq!(f.likely(entry), BranchPrediction::Unlikely);

    // A constant-true condition keeps only the first successor.
    let t = f.value(entry, Op::ConstBool, 1, &[]);
    f.set_control(entry, Some(t));
    assert!(rewrite_block_generic(&mut f, entry, &config));
    assert_eq!(f.block_kind(entry), BlockKind::Plain);
    assert_eq!(f.control(entry), None);
    assert_eq!(f.succs(entry), &[no]);
    assert!(f.blocks[yes.0].preds.is_empty());
    assert_eq!(f.blocks[no.0].preds, vec![entry]);

    // Plain blocks have no rules; an If on an opaque value matches nothing.
    assert!(!rewrite_block_generic(&mut f, entry, &config));
    let other = f.new_block(BlockKind::If);
    f.add_edge(other, yes);
    f.add_edge(other, no);
    f.set_control(other, Some(cond));
    assert!(!rewrite_block_generic(&mut f, other, &config));
    assert_eq!(f.succs(other), &[yes, no]);
}

fn main() {
    values();
    blocks();
}

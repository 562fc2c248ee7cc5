//! Catalog queries behind each diagnostic.
//!
//! Every query binds the schema name as `$1`; bloat queries also bind the bloat
//! percentage threshold as `$2`. Rows come back ordered by table name, then object name.

pub(crate) const INVALID_INDEXES: &str = r#"
    select
        x.indrelid::regclass::text as table_name,
        x.indexrelid::regclass::text as index_name
    from pg_catalog.pg_index x
        join pg_catalog.pg_class ic on ic.oid = x.indexrelid
        join pg_catalog.pg_namespace nsp on nsp.oid = ic.relnamespace
    where
        nsp.nspname = $1::text
        and not x.indisvalid
    order by table_name, index_name
"#;

pub(crate) const DUPLICATED_INDEXES: &str = r#"
    select
        table_name,
        string_agg('idx=' || index_name || ', size=' || index_size, '; ' order by index_name) as duplicated_indexes
    from (
        select
            x.indrelid::regclass::text as table_name,
            x.indexrelid::regclass::text as index_name,
            pg_relation_size(x.indexrelid) as index_size,
            x.indrelid::text || ' ' || x.indclass::text || ' ' || x.indkey::text || ' ' ||
                x.indcollation::text || ' ' ||
                coalesce(pg_get_expr(x.indexprs, x.indrelid), '') || ' ' ||
                coalesce(pg_get_expr(x.indpred, x.indrelid), '') as grouping_key
        from pg_catalog.pg_index x
            join pg_catalog.pg_class ic on ic.oid = x.indexrelid
            join pg_catalog.pg_namespace nsp on nsp.oid = ic.relnamespace
            join pg_catalog.pg_am am on am.oid = ic.relam
        where
            nsp.nspname = $1::text
            and am.amname = 'btree'
    ) idx
    group by table_name, grouping_key
    having count(*) > 1
    order by table_name, duplicated_indexes
"#;

// indnullsnotdistinct appeared in PostgreSQL 15
pub(crate) const DUPLICATED_INDEXES_PG15: &str = r#"
    select
        table_name,
        string_agg('idx=' || index_name || ', size=' || index_size, '; ' order by index_name) as duplicated_indexes
    from (
        select
            x.indrelid::regclass::text as table_name,
            x.indexrelid::regclass::text as index_name,
            pg_relation_size(x.indexrelid) as index_size,
            x.indrelid::text || ' ' || x.indclass::text || ' ' || x.indkey::text || ' ' ||
                x.indcollation::text || ' ' || x.indnullsnotdistinct::text || ' ' ||
                coalesce(pg_get_expr(x.indexprs, x.indrelid), '') || ' ' ||
                coalesce(pg_get_expr(x.indpred, x.indrelid), '') as grouping_key
        from pg_catalog.pg_index x
            join pg_catalog.pg_class ic on ic.oid = x.indexrelid
            join pg_catalog.pg_namespace nsp on nsp.oid = ic.relnamespace
            join pg_catalog.pg_am am on am.oid = ic.relam
        where
            nsp.nspname = $1::text
            and am.amname = 'btree'
    ) idx
    group by table_name, grouping_key
    having count(*) > 1
    order by table_name, duplicated_indexes
"#;

pub(crate) const INTERSECTED_INDEXES: &str = r#"
    select
        a.indrelid::regclass::text as table_name,
        'idx=' || a.indexrelid::regclass::text || ', size=' || pg_relation_size(a.indexrelid) ||
            '; idx=' || b.indexrelid::regclass::text || ', size=' || pg_relation_size(b.indexrelid)
            as intersected_indexes
    from pg_catalog.pg_index a
        join pg_catalog.pg_index b on b.indrelid = a.indrelid
            and a.indexrelid > b.indexrelid
            and a.indkey::text <> b.indkey::text
            and (
                (a.indkey::text || ' ') like (b.indkey::text || ' %')
                or (b.indkey::text || ' ') like (a.indkey::text || ' %')
            )
        join pg_catalog.pg_class pc on pc.oid = a.indrelid
        join pg_catalog.pg_namespace nsp on nsp.oid = pc.relnamespace
    where
        nsp.nspname = $1::text
        and a.indexprs is null and b.indexprs is null
        and a.indpred is null and b.indpred is null
    order by table_name, intersected_indexes
"#;

pub(crate) const FOREIGN_KEYS_WITHOUT_INDEX: &str = r#"
    select
        c.conrelid::regclass::text as table_name,
        c.conname::text as constraint_name,
        array_agg(quote_ident(a.attname) || ',' || a.attnotnull::text order by u.attposition) as columns
    from pg_catalog.pg_constraint c
        join lateral unnest(c.conkey) with ordinality as u(attnum, attposition) on true
        join pg_catalog.pg_class t on t.oid = c.conrelid
        join pg_catalog.pg_namespace nsp on nsp.oid = t.relnamespace
        join pg_catalog.pg_attribute a on a.attrelid = c.conrelid and a.attnum = u.attnum
    where
        c.contype = 'f'
        and nsp.nspname = $1::text
        and not exists (
            select 1
            from pg_catalog.pg_index pi
            where
                pi.indrelid = c.conrelid
                and pi.indpred is null
                and (string_to_array(pi.indkey::text, ' ')::int2[])[1:array_length(c.conkey, 1)] @> c.conkey
        )
    group by c.conrelid, c.conname, c.oid
    order by table_name, constraint_name
"#;

pub(crate) const TABLES_WITHOUT_PRIMARY_KEY: &str = r#"
    select
        pc.oid::regclass::text as table_name,
        pg_table_size(pc.oid) as table_size
    from pg_catalog.pg_class pc
        join pg_catalog.pg_namespace nsp on nsp.oid = pc.relnamespace
    where
        pc.relkind in ('r', 'p')
        and not pc.relispartition
        and nsp.nspname = $1::text
        and not exists (
            select 1 from pg_catalog.pg_constraint c
            where c.conrelid = pc.oid and c.contype = 'p'
        )
    order by table_name
"#;

pub(crate) const INDEXES_WITH_NULL_VALUES: &str = r#"
    select
        x.indrelid::regclass::text as table_name,
        x.indexrelid::regclass::text as index_name,
        pg_relation_size(x.indexrelid) as index_size,
        a.attname::text as nullable_field
    from pg_catalog.pg_index x
        join pg_catalog.pg_class ic on ic.oid = x.indexrelid
        join pg_catalog.pg_namespace nsp on nsp.oid = ic.relnamespace
        join pg_catalog.pg_attribute a on a.attrelid = x.indrelid and a.attnum = x.indkey[0]
    where
        nsp.nspname = $1::text
        and not x.indisunique
        and not a.attnotnull
        and x.indnatts = 1
        and x.indpred is null
    order by table_name, index_name
"#;

pub(crate) const NOT_VALID_CONSTRAINTS: &str = r#"
    select
        c.conrelid::regclass::text as table_name,
        c.conname::text as constraint_name,
        c.contype::text as constraint_type
    from pg_catalog.pg_constraint c
        join pg_catalog.pg_namespace nsp on nsp.oid = c.connamespace
    where
        not c.convalidated
        and c.contype in ('c', 'f')
        and nsp.nspname = $1::text
    order by table_name, constraint_name
"#;

pub(crate) const UNUSED_INDEXES: &str = r#"
    select
        psui.relid::regclass::text as table_name,
        psui.indexrelid::regclass::text as index_name,
        pg_relation_size(psui.indexrelid) as index_size,
        coalesce(psui.idx_scan, 0) as index_scans
    from pg_catalog.pg_stat_all_indexes psui
        join pg_catalog.pg_index i on i.indexrelid = psui.indexrelid
    where
        psui.schemaname = $1::text
        and not i.indisunique
        and not i.indisprimary
        and not i.indisexclusion
        and coalesce(psui.idx_scan, 0) < 50
    order by table_name, index_name
"#;

pub(crate) const TABLES_WITH_MISSING_INDEXES: &str = r#"
    select
        psat.relid::regclass::text as table_name,
        pg_table_size(psat.relid) as table_size,
        coalesce(psat.seq_scan, 0) as seq_scan,
        coalesce(psat.idx_scan, 0) as idx_scan
    from pg_catalog.pg_stat_all_tables psat
    where
        psat.schemaname = $1::text
        and pg_table_size(psat.relid) > 5 * current_setting('block_size')::bigint
        and coalesce(psat.seq_scan, 0) > coalesce(psat.idx_scan, 0)
    order by table_name
"#;

pub(crate) const BLOATED_INDEXES: &str = r#"
    with index_stats as (
        select
            pi.indrelid,
            pi.indexrelid,
            pc.reltuples::numeric as reltuples,
            pc.relpages::numeric as relpages,
            current_setting('block_size')::numeric as block_size,
            coalesce(substring(array_to_string(pc.reloptions, ' ') from 'fillfactor=([0-9]+)')::numeric, 90) as fill_factor,
            sum((1 - coalesce(s.null_frac, 0)::numeric) * coalesce(s.avg_width, 1024)) as data_width
        from pg_catalog.pg_index pi
            join pg_catalog.pg_class pc on pc.oid = pi.indexrelid
            join pg_catalog.pg_namespace nsp on nsp.oid = pc.relnamespace
            join pg_catalog.pg_am am on am.oid = pc.relam
            join pg_catalog.pg_class tc on tc.oid = pi.indrelid
            join pg_catalog.pg_attribute a on a.attrelid = pi.indrelid
                and a.attnum = any(string_to_array(pi.indkey::text, ' ')::int2[])
            left join pg_catalog.pg_stats s on s.schemaname = nsp.nspname
                and s.tablename = tc.relname
                and s.attname = a.attname
        where
            nsp.nspname = $1::text
            and am.amname = 'btree'
            and pc.relpages > 0
        group by pi.indrelid, pi.indexrelid, pc.reltuples, pc.relpages, pc.reloptions
    ),
    index_estimates as (
        select
            indrelid,
            indexrelid,
            relpages,
            block_size,
            greatest(
                relpages - ceil(reltuples * (16 + data_width) / ((block_size - 40) * fill_factor / 100)) - 1,
                0
            ) as bloat_pages
        from index_stats
    )
    select
        indrelid::regclass::text as table_name,
        indexrelid::regclass::text as index_name,
        pg_relation_size(indexrelid) as index_size,
        (bloat_pages * block_size)::bigint as bloat_size,
        round(100 * bloat_pages / relpages, 2)::float8 as bloat_percentage
    from index_estimates
    where 100 * bloat_pages / relpages >= $2::numeric
    order by table_name, index_name
"#;

pub(crate) const BLOATED_TABLES: &str = r#"
    with table_stats as (
        select
            pc.oid,
            pc.reltuples::numeric as reltuples,
            pc.relpages::numeric as relpages,
            current_setting('block_size')::numeric as block_size,
            coalesce(substring(array_to_string(pc.reloptions, ' ') from 'fillfactor=([0-9]+)')::numeric, 100) as fill_factor,
            24 + sum((1 - coalesce(s.null_frac, 0)::numeric) * coalesce(s.avg_width, 1024)) as tuple_width
        from pg_catalog.pg_class pc
            join pg_catalog.pg_namespace nsp on nsp.oid = pc.relnamespace
            join pg_catalog.pg_attribute a on a.attrelid = pc.oid
                and a.attnum > 0
                and not a.attisdropped
            left join pg_catalog.pg_stats s on s.schemaname = nsp.nspname
                and s.tablename = pc.relname
                and s.attname = a.attname
        where
            nsp.nspname = $1::text
            and pc.relkind in ('r', 'm')
            and pc.relpages > 0
        group by pc.oid, pc.reltuples, pc.relpages, pc.reloptions
    ),
    table_estimates as (
        select
            oid,
            relpages,
            block_size,
            greatest(
                relpages - ceil(reltuples * (tuple_width + 4) / ((block_size - 24) * fill_factor / 100)),
                0
            ) as bloat_pages
        from table_stats
    )
    select
        oid::regclass::text as table_name,
        pg_table_size(oid) as table_size,
        (bloat_pages * block_size)::bigint as bloat_size,
        round(100 * bloat_pages / relpages, 2)::float8 as bloat_percentage
    from table_estimates
    where 100 * bloat_pages / relpages >= $2::numeric
    order by table_name
"#;
